pub mod classifier;
pub mod config;
pub mod dataset;
pub mod detector;
pub mod dispatcher;
pub mod fps;
pub mod gestures;
pub mod hid;
pub mod keyboard;
pub mod keypoint_features;
pub mod logger;
pub mod mouse_filter;
pub mod pipeline;
pub mod point_history;
pub mod types;
pub mod vote;
