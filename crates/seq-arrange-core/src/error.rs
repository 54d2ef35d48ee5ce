use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeqArrangeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Object {id} is too large to fit onto the print bed")]
    ObjectTooLarge { id: i32 },

    #[error("Object {id} uses polygon height {height} which the printer geometry does not describe")]
    UnsupportedPolygonHeight { id: i32, height: i64 },

    #[error("Complete scheduling failure: unable to schedule even a single object on an empty plate")]
    SchedulingFailure,
}

pub type Result<T> = std::result::Result<T, SeqArrangeError>;
