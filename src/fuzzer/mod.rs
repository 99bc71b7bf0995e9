mod mutator;
mod payloads;

pub use mutator::{MUTATION_COUNT, mutate, mutation_label};
pub use payloads::{Payload, PayloadCatalog, VulnClass};
