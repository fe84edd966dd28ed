mod common;
mod companies;
mod routing;
mod stages;
