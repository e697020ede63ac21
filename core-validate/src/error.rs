use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidateError {
    /// A condition column observed more than one distinct value within one
    /// file. Grouping cannot be resolved automatically; operator
    /// intervention is required.
    #[error("Multiple conditions in file {file}: column {column} has values [{}]", values.join(", "))]
    AmbiguousConditions {
        file: String,
        column: String,
        values: Vec<String>,
    },

    /// A readout column referenced a protocol the caller did not fetch.
    #[error("Protocol {name} was not resolved before validation")]
    UnknownProtocol { name: String },

    /// The ingested array has no header row to index.
    #[error("File {file} has no header row")]
    EmptyFile { file: String },
}

pub type Result<T> = std::result::Result<T, ValidateError>;
