//! Controller interfaces
//!
//! Each controller in `base_exec` shall implement the `Controller` trait in
//! this module.

// ---------------------------------------------------------------------------
// CONTROLLER CAPABILITY
// ---------------------------------------------------------------------------

/// The capability interface of a cyclic controller.
///
/// A controller is configured once with `init`, armed with `starting`, and
/// then driven by calling `update` once per control cycle. `update` cannot
/// fail: any numerical or data problem met during a cycle is handled inside
/// the cycle and reported through the status report.
pub trait Controller {
    /// Data required during initialisation
    type InitData;
    /// An error which can occur during initialisation.
    type InitError;
    /// An error which prevents the controller from starting.
    type StartError;

    /// Data required for cyclic processing.
    type InputData;
    /// Data produced by cyclic processing.
    type OutputData;
    /// A report on the status of the cyclic processing.
    type StatusReport;

    /// Initialise the controller.
    ///
    /// # Inputs
    /// - `init_data`: The configuration the controller will run with for its
    ///   whole lifetime.
    ///
    /// # Outputs
    /// - On success `Ok(())`.
    /// - On error an `InitError` instance, the controller must not be
    ///   started.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError>;

    /// Prepare the controller to run, resetting any accumulated state.
    ///
    /// # Outputs
    /// - On success `Ok(())`, after which `update` may be called.
    /// - On error a `StartError` instance, `update` must not issue commands.
    fn starting(&mut self) -> Result<(), Self::StartError>;

    /// Main cyclic processing function.
    ///
    /// # Inputs
    /// - `input_data`: The data required for processing by the controller.
    ///
    /// # Outputs
    /// - A tuple of the output data and status report.
    fn update(&mut self, input_data: &Self::InputData) -> (Self::OutputData, Self::StatusReport);
}
