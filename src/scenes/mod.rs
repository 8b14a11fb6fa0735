pub mod bump;

pub use bump::{plan_for, BumpRender, BumpScene, SetupPlan};
