use thiserror::Error;

use crate::slot::CallConvention;

#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("no implementation of {operation} found for {type_name}")]
  UnimplementedOperation {
    operation: String,
    type_name: &'static str,
  },
  #[error("{operation} is not an operation of {interface}")]
  UnknownOperation {
    operation: String,
    interface: &'static str,
  },
  #[error("invalid implementation for {operation}: {reason}")]
  InvalidRegistrant { operation: String, reason: String },
  #[error("{operation} of {interface} does not have the requested signature")]
  SignatureMismatch {
    operation: String,
    interface: &'static str,
  },
  #[error("{operation} is a {expected} operation, cannot call it as {found}")]
  ConventionMismatch {
    operation: String,
    expected:  CallConvention,
    found:     CallConvention,
  },
  #[error("{operation} expects a {expected} receiver, {found} cannot be projected to it")]
  InvalidReceiver {
    operation: String,
    expected:  &'static str,
    found:     &'static str,
  },
  #[error("{operation} already has an implementation for {type_name}")]
  DuplicateRegistration {
    operation: String,
    type_name: &'static str,
  },
  #[error("{operation} is declared twice in {interface}")]
  DuplicateOperation {
    operation: &'static str,
    interface: &'static str,
  },
  #[error("type {type_name} is already declared")]
  AlreadyDeclared { type_name: &'static str },
  #[error("cannot linearize the bases of {type_name}")]
  InconsistentHierarchy { type_name: &'static str },
  #[error(transparent)]
  Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
