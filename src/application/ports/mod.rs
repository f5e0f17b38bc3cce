//! Ports - Interfaces between the director core and its collaborators

pub mod outbound;
