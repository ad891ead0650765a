//! Transition batch.

/// A batch of transitions, decomposed into parallel aligned columns.
pub trait TransitionBatch {
    /// A batch of observations.
    type ObsBatch;

    /// A batch of actions.
    type ActBatch;

    /// Unpacks the batch into
    /// `(obs, act, next_obs, reward, is_done)`.
    fn unpack(
        self,
    ) -> (
        Self::ObsBatch,
        Self::ActBatch,
        Self::ObsBatch,
        Vec<f32>,
        Vec<i8>,
    );

    /// Returns the number of transitions in the batch.
    fn len(&self) -> usize;

    /// Returns a reference to the batch of observations.
    fn obs(&self) -> &Self::ObsBatch;

    /// Returns a reference to the batch of actions.
    fn act(&self) -> &Self::ActBatch;
}
