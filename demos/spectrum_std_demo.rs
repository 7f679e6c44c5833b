// Runs the spectrum manager on the embassy std executor against a simulated
// Wi-Fi interferer and logs what the model learns.

use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};
use env_logger::Builder;
use log::{LevelFilter, log};
use radio_spectrum_lib::noise_simulator::{NoiseProfile, NoiseSimulator};
use radio_spectrum_lib::{Channel, InterruptEntropy, SpectrumManager, SpectrumManagerError, WyRandEntropy};

const WIFI_FIRST_CHANNEL: u8 = 12;
const WIFI_LAST_CHANNEL: u8 = 31;
const REPORT_INTERVAL_MS: u64 = 2;
const SUMMARY_INTERVAL_SECS: u64 = 2;
const HOP_INTERVAL_MS: u64 = 250;

#[embassy_executor::task]
async fn traffic(radio_spectrum_manager: &'static SpectrumManager, mut simulator: NoiseSimulator) -> ! {
    loop {
        let channel = simulator.random_channel();
        let retry_count = simulator.sample(channel);
        match radio_spectrum_manager.report_retries(channel, retry_count) {
            Ok(()) => {}
            Err(SpectrumManagerError::QueueFull) => log!(log::Level::Debug, "Report queue full, backing off"),
            Err(error) => log!(log::Level::Error, "Report failed: {}", error),
        }
        Timer::after(Duration::from_millis(REPORT_INTERVAL_MS)).await;
    }
}

fn log_summary(radio_spectrum_manager: &SpectrumManager) {
    for first in (0..=radio_spectrum_lib::MAX_RF_CHANNEL).step_by(8) {
        if let Some(channel) = Channel::new(first) {
            let energy = radio_spectrum_manager.energy(channel).unwrap_or(0);
            let bar = "#".repeat((energy / 20) as usize);
            log!(log::Level::Info, "  ch{:>3} {:>4} {}", channel.value(), energy, bar);
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    Builder::new().filter_level(LevelFilter::Info).init();

    log!(log::Level::Info, "Starting up");
    let mut radio_spectrum_manager_temp = SpectrumManager::new();
    if let Err(error) = radio_spectrum_manager_temp.initialize(spawner) {
        log!(log::Level::Error, "Error initializing spectrum manager: {}", error);
        return;
    }
    let radio_spectrum_manager: &'static SpectrumManager = Box::leak(Box::new(radio_spectrum_manager_temp));

    let (Some(first), Some(last)) = (Channel::new(WIFI_FIRST_CHANNEL), Channel::new(WIFI_LAST_CHANNEL)) else {
        log!(log::Level::Error, "Interferer band outside the legal channel range");
        return;
    };
    let profile = NoiseProfile::uniform(40).with_band(first, last, 700);
    let simulator = NoiseSimulator::new(profile, 60, 0x5EED);
    if spawner.spawn(traffic(radio_spectrum_manager, simulator)).is_err() {
        log!(log::Level::Error, "Failed to spawn traffic task");
        return;
    }

    // Stands in for the radio ISR, which owns its own generator
    let mut isr_entropy = InterruptEntropy::new(WyRandEntropy::new(0xC0FFEE));
    let mut next_summary = Instant::now() + Duration::from_secs(SUMMARY_INTERVAL_SECS);
    loop {
        match select(Timer::at(next_summary), Timer::after(Duration::from_millis(HOP_INTERVAL_MS))).await {
            Either::First(_) => {
                log!(log::Level::Info, "Spectrum summary:");
                log_summary(radio_spectrum_manager);
                next_summary += Duration::from_secs(SUMMARY_INTERVAL_SECS);
            }
            Either::Second(_) => {
                if let Ok(channel) = radio_spectrum_manager.suggest_channel(&mut isr_entropy) {
                    log!(log::Level::Info, "Suggested hop target: {}", channel);
                }
            }
        }
    }
}
