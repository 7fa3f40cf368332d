pub mod upload_sweeper;

pub use upload_sweeper::UploadSweeper;
