use crate::validate::ValidationOutcome;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(
        "field path '{path}': segment '{segment}' holds a scalar where an object was expected"
    )]
    PathConflict { path: String, segment: String },
    #[error("section {section} is incomplete: {summary}", summary = .outcome.summary())]
    SectionIncomplete {
        section: usize,
        outcome: ValidationOutcome,
    },
    #[error("a submission is already in flight for this session")]
    SubmitInFlight,
    #[error("{0}")]
    Submission(String),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    RecordWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    RecordRead(std::io::Error),
    #[error("failed to serialise record: {0}")]
    RecordSerialisation(serde_yaml::Error),
    #[error("failed to deserialise record: {0}")]
    RecordDeserialisation(serde_yaml::Error),
    #[error(transparent)]
    Key(#[from] intake_types::KeyError),
    #[error(transparent)]
    Path(#[from] intake_types::PathError),
}

pub type IntakeResult<T> = std::result::Result<T, IntakeError>;
