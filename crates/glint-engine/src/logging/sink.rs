use crate::device::DeviceError;

/// Receives per-frame failures from the render loop.
pub trait DiagnosticSink {
    fn frame_failed(&mut self, frame_index: u64, error: &DeviceError);
}

/// Forwards frame failures to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn frame_failed(&mut self, frame_index: u64, error: &DeviceError) {
        if error.is_fatal() {
            log::error!("frame {frame_index}: {error}");
        } else {
            log::warn!("frame {frame_index} skipped: {error}");
        }
    }
}

impl<F> DiagnosticSink for F
where
    F: FnMut(u64, &DeviceError),
{
    fn frame_failed(&mut self, frame_index: u64, error: &DeviceError) {
        self(frame_index, error)
    }
}
