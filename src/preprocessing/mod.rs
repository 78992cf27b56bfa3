//! Feature preprocessing
//!
//! The preprocessor is fit once on training features and then applied,
//! never re-fit, to any other split: numeric columns are standardized with
//! training statistics and categorical columns one-hot encoded with the
//! category set frozen at fit time.

mod encoder;
mod pipeline;
mod scaler;

pub use encoder::OneHotEncoder;
pub use pipeline::FeaturePreprocessor;
pub use scaler::StandardScaler;
