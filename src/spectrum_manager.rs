//! # Spectrum Manager - Firmware Integration of the Spectrum Model
//!
//! Connects the spectrum model to the two execution contexts of the radio
//! stack:
//! - **Task context**: the transmission path reports the retry count of every
//!   delivered packet. Reports go through a bounded queue and are folded into
//!   the model by [`spectrum_update_task`].
//! - **Interrupt context**: the radio ISR asks for a channel when a link has to
//!   hop or a new link is set up.
//!
//! ## Shared State
//!
//! The model is the only state shared between the two contexts. It sits in a
//! [`SharedSpectrumModel`], a critical-section blocking mutex, so every access
//! from either context runs inside one non-reentrant critical section. Both
//! operations are `O(NUM_BUCKETS)` and never block inside it.
//!
//! ## Storage
//!
//! - `embedded`: queue and model live in statics
//! - `std`: queue and model are leaked boxes, so several managers can coexist
//!   in host tests and simulations

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{Level, log};

use crate::RETRY_REPORT_QUEUE_SIZE;
use crate::channel::{Channel, RetryCount};
use crate::entropy::{EntropySource, InterruptEntropy};
use crate::spectrum_model::SpectrumModel;

/// Retry count observed for one delivered packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryReport {
    pub channel: Channel,
    pub retry_count: RetryCount,
}

/// Spectrum model shared between task and interrupt context
pub type SharedSpectrumModel = Mutex<CriticalSectionRawMutex, RefCell<SpectrumModel>>;

pub(crate) type RetryReportQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, RetryReport, RETRY_REPORT_QUEUE_SIZE>;
type RetryReportQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, RetryReport, RETRY_REPORT_QUEUE_SIZE>;

#[cfg(feature = "embedded")]
static RETRY_REPORT_QUEUE: RetryReportQueue = embassy_sync::channel::Channel::new();

#[cfg(feature = "embedded")]
static SPECTRUM_MODEL: SharedSpectrumModel = Mutex::new(RefCell::new(SpectrumModel::new()));

/// Errors returned by [`SpectrumManager`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpectrumManagerError {
    /// `initialize` has not been called
    NotInited,
    /// The retry report queue is full, the report was dropped
    QueueFull,
    /// The update task could not be spawned
    SpawnFailed,
}

impl core::fmt::Display for SpectrumManagerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SpectrumManagerError::NotInited => write!(f, "spectrum manager not initialized"),
            SpectrumManagerError::QueueFull => write!(f, "retry report queue full"),
            SpectrumManagerError::SpawnFailed => write!(f, "failed to spawn spectrum update task"),
        }
    }
}

/// Spectrum update task
///
/// Drains the retry report queue and folds every report into the shared model.
///
/// # Parameters
/// * `retry_report_queue_receiver` - Receiver side of the retry report queue
/// * `model` - Shared model the reports are applied to
#[cfg_attr(feature = "std", embassy_executor::task(pool_size = 10))]
#[cfg_attr(not(feature = "std"), embassy_executor::task)]
pub(crate) async fn spectrum_update_task(
    retry_report_queue_receiver: RetryReportQueueReceiver,
    model: &'static SharedSpectrumModel,
) -> ! {
    log!(Level::Info, "Spectrum update task started");
    loop {
        let report = retry_report_queue_receiver.receive().await;
        apply_report(model, report);
    }
}

#[cfg(all(test, feature = "std"))]
pub(crate) async fn spectrum_update_step(retry_report_queue_receiver: RetryReportQueueReceiver, model: &'static SharedSpectrumModel) {
    // A single-iteration version of the update loop
    let report = retry_report_queue_receiver.receive().await;
    apply_report(model, report);
}

fn apply_report(model: &SharedSpectrumModel, report: RetryReport) {
    model.lock(|cell| cell.borrow_mut().update(report.channel, report.retry_count));
}

enum SpectrumManagerState {
    Uninitialized,
    Initialized {
        retry_report_queue: &'static RetryReportQueue,
        model: &'static SharedSpectrumModel,
    },
}

/// Owner of the spectrum model in a running radio stack
pub struct SpectrumManager {
    state: SpectrumManagerState,
}

impl Default for SpectrumManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumManager {
    pub const fn new() -> Self {
        SpectrumManager {
            state: SpectrumManagerState::Uninitialized,
        }
    }

    #[cfg(feature = "embedded")]
    pub fn initialize(&mut self, spawner: Spawner) -> Result<(), SpectrumManagerError> {
        self.initialize_common(spawner, &RETRY_REPORT_QUEUE, &SPECTRUM_MODEL)
    }

    #[cfg(feature = "std")]
    pub fn initialize(&mut self, spawner: Spawner) -> Result<(), SpectrumManagerError> {
        let (retry_report_queue, model) = leak_storage();
        self.initialize_common(spawner, retry_report_queue, model)
    }

    fn initialize_common(
        &mut self,
        spawner: Spawner,
        retry_report_queue: &'static RetryReportQueue,
        model: &'static SharedSpectrumModel,
    ) -> Result<(), SpectrumManagerError> {
        spawner
            .spawn(spectrum_update_task(retry_report_queue.receiver(), model))
            .map_err(|_| SpectrumManagerError::SpawnFailed)?;
        log!(Level::Debug, "Spectrum update task spawned");

        self.attach(retry_report_queue, model);
        log!(Level::Info, "Spectrum manager initialized");
        Ok(())
    }

    fn attach(&mut self, retry_report_queue: &'static RetryReportQueue, model: &'static SharedSpectrumModel) {
        self.state = SpectrumManagerState::Initialized { retry_report_queue, model };
    }

    fn parts(&self) -> Result<(&'static RetryReportQueue, &'static SharedSpectrumModel), SpectrumManagerError> {
        match &self.state {
            SpectrumManagerState::Uninitialized => Err(SpectrumManagerError::NotInited),
            SpectrumManagerState::Initialized { retry_report_queue, model } => Ok((*retry_report_queue, *model)),
        }
    }

    /// Queues the retry count of a completed transmission (task context)
    ///
    /// Never waits: when the queue is full the report is dropped and
    /// `QueueFull` is returned.
    pub fn report_retries(&self, channel: Channel, retry_count: RetryCount) -> Result<(), SpectrumManagerError> {
        let (retry_report_queue, _) = self.parts()?;
        retry_report_queue.try_send(RetryReport { channel, retry_count }).map_err(|_| {
            log!(Level::Warn, "Retry report queue full, dropping report for {}", channel);
            SpectrumManagerError::QueueFull
        })
    }

    /// Current noise estimate of `channel`
    pub fn energy(&self, channel: Channel) -> Result<u32, SpectrumManagerError> {
        let (_, model) = self.parts()?;
        Ok(model.lock(|cell| cell.borrow().energy(channel)))
    }

    /// Suggests the least contested channel (interrupt context only)
    pub fn suggest_channel<E: EntropySource>(&self, entropy: &mut InterruptEntropy<E>) -> Result<Channel, SpectrumManagerError> {
        let (_, model) = self.parts()?;
        Ok(model.lock(|cell| cell.borrow_mut().suggest_channel(entropy)))
    }

    /// Clears the model and drops every report still waiting in the queue
    pub fn reset(&self) -> Result<(), SpectrumManagerError> {
        let (retry_report_queue, model) = self.parts()?;
        let mut dropped = 0usize;
        while retry_report_queue.try_receive().is_ok() {
            dropped += 1;
        }
        model.lock(|cell| cell.borrow_mut().init());
        log!(Level::Info, "Spectrum model reset, {} pending reports dropped", dropped);
        Ok(())
    }
}

#[cfg(feature = "std")]
fn leak_storage() -> (&'static RetryReportQueue, &'static SharedSpectrumModel) {
    let retry_report_queue: &'static RetryReportQueue = Box::leak(Box::new(embassy_sync::channel::Channel::new()));
    let model: &'static SharedSpectrumModel = Box::leak(Box::new(Mutex::new(RefCell::new(SpectrumModel::new()))));
    (retry_report_queue, model)
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::MAX_RETRIES;
    use crate::entropy::CountingEntropy;
    use futures::executor::block_on;

    fn ch(raw: u8) -> Channel {
        Channel::new(raw).unwrap()
    }

    fn attached_manager() -> (SpectrumManager, &'static RetryReportQueue, &'static SharedSpectrumModel) {
        let (queue, model) = leak_storage();
        let mut manager = SpectrumManager::new();
        manager.attach(queue, model);
        (manager, queue, model)
    }

    #[test]
    fn operations_fail_before_initialize() {
        let manager = SpectrumManager::new();
        let mut isr = InterruptEntropy::new(CountingEntropy::new(1));
        assert_eq!(manager.report_retries(ch(1), RetryCount::ZERO), Err(SpectrumManagerError::NotInited));
        assert_eq!(manager.energy(ch(1)), Err(SpectrumManagerError::NotInited));
        assert_eq!(manager.suggest_channel(&mut isr), Err(SpectrumManagerError::NotInited));
        assert_eq!(manager.reset(), Err(SpectrumManagerError::NotInited));
    }

    #[test]
    fn reported_retries_reach_the_model_through_the_update_step() {
        let (manager, queue, model) = attached_manager();
        manager.report_retries(ch(40), RetryCount::MAX).unwrap();

        // Queued but not applied yet
        assert_eq!(manager.energy(ch(40)), Ok(0));

        block_on(spectrum_update_step(queue.receiver(), model));
        let energy = manager.energy(ch(40)).unwrap();
        assert!(energy > 0 && energy <= MAX_RETRIES);
        assert_eq!(manager.energy(ch(41)), Ok(energy));
    }

    #[test]
    fn full_queue_drops_reports() {
        let (manager, _queue, _model) = attached_manager();
        for i in 0..RETRY_REPORT_QUEUE_SIZE {
            manager.report_retries(ch(i as u8), RetryCount::MAX).unwrap();
        }
        assert_eq!(manager.report_retries(ch(0), RetryCount::MAX), Err(SpectrumManagerError::QueueFull));
    }

    #[test]
    fn reset_clears_model_and_pending_reports() {
        let (manager, queue, model) = attached_manager();
        manager.report_retries(ch(10), RetryCount::MAX).unwrap();
        block_on(spectrum_update_step(queue.receiver(), model));
        manager.report_retries(ch(20), RetryCount::MAX).unwrap();

        manager.reset().unwrap();
        assert!(Channel::all().all(|c| manager.energy(c) == Ok(0)));
        assert!(queue.try_receive().is_err());
    }

    #[test]
    fn suggestion_avoids_reported_noise() {
        let (manager, queue, model) = attached_manager();
        // Everything except channels 100 and 101 is noisy
        for bucket_start in (0..=crate::MAX_RF_CHANNEL).step_by(2) {
            if bucket_start == 100 {
                continue;
            }
            manager.report_retries(ch(bucket_start), RetryCount::MAX).unwrap();
            block_on(spectrum_update_step(queue.receiver(), model));
        }

        let mut isr = InterruptEntropy::new(CountingEntropy::new(8));
        for _ in 0..20 {
            let channel = manager.suggest_channel(&mut isr).unwrap();
            assert!(channel.value() == 100 || channel.value() == 101, "got {}", channel);
        }
    }

    #[test]
    fn error_display() {
        assert_eq!(format!("{}", SpectrumManagerError::QueueFull), "retry report queue full");
    }
}
