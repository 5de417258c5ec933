use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error(
        "Invalid time window: {what} (t_start={t_start}, t_end={t_end}, step_size={step_size})"
    )]
    InvalidWindow {
        what: &'static str,
        t_start: f64,
        t_end: f64,
        step_size: f64,
    },
}
