use std::fmt;

#[derive(Debug)]
pub enum TaqrirError {
    InvalidConfiguration(String),
    UnplaceableBlock(String),
    FontParse(String),
    Io(std::io::Error),
}

impl fmt::Display for TaqrirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaqrirError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            TaqrirError::UnplaceableBlock(message) => {
                write!(f, "block cannot fit on any page: {}", message)
            }
            TaqrirError::FontParse(message) => write!(f, "font parse error: {}", message),
            TaqrirError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for TaqrirError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaqrirError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TaqrirError {
    fn from(value: std::io::Error) -> Self {
        TaqrirError::Io(value)
    }
}
