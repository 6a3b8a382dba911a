mod generator;

pub use generator::{GeneratorClient, GeneratorConfig, GeneratorError};
