use adframe_driver::DriverError;
use adframe_persist::PersistError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl MonitorError {
    /// Page-load timeouts get a driver relaunch from the experiment runner;
    /// everything else abandons the visit.
    pub fn is_nav_timeout(&self) -> bool {
        matches!(self, Self::Driver(DriverError::NavTimeout))
    }
}
