//! Forwarding of visualization frames to the page.

use atome_core::{Registration, ReportDispatcher, VisualizationFrame};

use crate::handle::WebViewHandle;
use crate::protocol::EVENT_VISUALIZATION_FRAME;

/// Emit every dispatched visualization frame as a `visualizationFrame` event.
///
/// Runs on the dispatcher thread, so at most 30 events per second. Dropping
/// the returned registration stops forwarding.
pub fn forward_visualization(dispatcher: &ReportDispatcher, handle: WebViewHandle) -> Registration {
    dispatcher.register(move |frame: &VisualizationFrame| {
        if handle.is_attached() {
            handle.emit(EVENT_VISUALIZATION_FRAME, frame);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::testing::sink_handle;
    use atome_core::{AudioBuffer, EngineConfig, Instance, RenderContext, Renderer};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn test_frames_reach_the_page() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::new()
            .with_channels(1)
            .with_log_directory(dir.path())
            .with_report_poll_interval_ms(1);
        let mut instance = Instance::new(config.clone()).unwrap();
        let dispatcher =
            ReportDispatcher::spawn(instance.reports, config.report_poll_interval()).unwrap();

        let (handle, sink) = sink_handle();
        let registration = forward_visualization(&dispatcher, handle);

        instance.control.start_test_tone(440.0);
        let mut samples = vec![0.0f32; 64];
        let mut channels = [samples.as_mut_slice()];
        let mut buffer = AudioBuffer::new(&mut channels);
        instance
            .engine
            .render(RenderContext::new(0.0), &mut buffer)
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while sink.scripts.lock().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }

        {
            let scripts = sink.scripts.lock();
            assert_eq!(scripts.len(), 1);
            assert!(scripts[0].starts_with(r#"window.__ATOME__._onEvent("visualizationFrame",{"samples":["#));
            assert!(scripts[0].contains(r#""zeroCrossings""#));
        }

        registration.unregister();
        dispatcher.shutdown();
    }
}
