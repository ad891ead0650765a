use super::Record;

/// Writes records to an output destination.
pub trait Recorder {
    /// Writes a record.
    fn write(&mut self, record: Record);

    /// Writes values aggregated from the records written so far.
    ///
    /// `step` is the training step (here: episode) the aggregation belongs
    /// to. The default implementation does nothing.
    fn flush(&mut self, _step: i64) {}
}
