pub mod recommendations;

pub use recommendations::{DatasetPaths, RankedVideos, RecommendationService, ReloadSummary};
