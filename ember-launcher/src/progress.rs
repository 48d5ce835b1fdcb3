use ember_lib::game::installer::types::ProgressReporter;

/// Forwards installer progress to the log
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn start_step(&self, name: &str, total_steps: Option<u32>) {
        match total_steps {
            Some(total) => log::info!("{} ({} steps)", name, total),
            None => log::info!("{}", name),
        }
    }

    fn update_bytes(&self, transferred: u64, total: Option<u64>) {
        log::trace!("{} / {:?} bytes", transferred, total);
    }

    fn set_message(&self, message: &str) {
        log::debug!("{}", message);
    }

    fn set_step_count(&self, current: u32, total: Option<u32>) {
        if let Some(total) = total {
            log::debug!("{}/{}", current, total);
        }
    }

    fn done(&self, success: bool, message: Option<&str>) {
        match (success, message) {
            (true, Some(msg)) => log::info!("{}", msg),
            (true, None) => {}
            (false, Some(msg)) => log::error!("Failed: {}", msg),
            (false, None) => log::error!("Failed"),
        }
    }
}
