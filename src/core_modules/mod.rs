pub mod decoder;
pub mod density;
pub mod histogram;
pub mod pixel;
pub mod preview;
pub mod report;
pub mod scorer;
pub mod segmenter;
pub mod slide;
