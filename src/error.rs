use std::fmt;

#[derive(Debug)]
pub enum PrepBookError {
    InvalidConfiguration(String),
    /// A question's recorded answer matches none of its options. `question`
    /// is 1-based, in input order.
    UnmatchedAnswer { question: usize, answer: String },
    Pdf(String),
    Io(std::io::Error),
}

impl fmt::Display for PrepBookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepBookError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            PrepBookError::UnmatchedAnswer { question, answer } => write!(
                f,
                "question {} answer {:?} does not match any option",
                question, answer
            ),
            PrepBookError::Pdf(message) => write!(f, "pdf error: {}", message),
            PrepBookError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for PrepBookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PrepBookError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PrepBookError {
    fn from(value: std::io::Error) -> Self {
        PrepBookError::Io(value)
    }
}

impl From<lopdf::Error> for PrepBookError {
    fn from(value: lopdf::Error) -> Self {
        PrepBookError::Pdf(value.to_string())
    }
}
