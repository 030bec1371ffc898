/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Error to open, read or write the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to parse a YAML document.
    #[error("Failed to parse the yaml file. {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Error to read or write a CSV table.
    #[error("Failed to process the csv table. {0}")]
    CsvError(#[from] csv::Error),

    /// A column requested by name is not in the table header.
    #[error("Column {0} not found in the table header")]
    MissingColumn(String),

    /// A table cell does not hold a number.
    #[error("Invalid value {value:?} in column {column} of row {row}")]
    InvalidValue {
        /// The data row, starting at 0.
        row: usize,
        /// The column name.
        column: String,
        /// The cell content.
        value: String,
    },

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] markerpose_image::ImageError),

    /// Error to decode or encode the image.
    #[error("Failed to decode the image. {0}")]
    ImageDecodeError(#[from] image::ImageError),

    /// The calibration is invalid.
    #[error(transparent)]
    CameraError(#[from] markerpose_camera::CameraError),

    /// The detector configuration is invalid.
    #[error(transparent)]
    ArucoError(#[from] markerpose_aruco::ArucoError),

    /// The frame source has no more frames or was shut down.
    #[error("The frame source is exhausted")]
    SourceExhausted,
}
