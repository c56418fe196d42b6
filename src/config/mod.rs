//! Configuration: tuning knobs for resolution, planning, generation,
//! caching, and deadlines.

mod settings;

pub use settings::{
    expand_env_vars, CacheSettings, CompileSettings, DatabaseSettings, GeneratorSettings,
    PlannerSettings, ResolverSettings, Settings, SettingsError,
};
