pub mod correlation;
pub mod pearson;
pub mod profile;

pub use correlation::{correlate_lags, CorrelationSummary, LagStatistic, StatisticsTable};
pub use pearson::{pearson, Correlation};
pub use profile::{lag_profile, lag_profiles, LagProfile, LagProfiles, ProfilePoint};
