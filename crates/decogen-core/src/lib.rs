pub mod geom;
pub mod model;
pub mod report;
