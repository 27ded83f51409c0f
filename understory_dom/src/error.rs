// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised by tree mutation.

use thiserror::Error;

/// Errors returned by operations that would leave the tree in an invalid shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum DomError {
    /// The insertion would create a cycle, or the child kind cannot be inserted
    /// (documents and shadow roots are never children).
    #[error("the operation would yield an incorrect node tree")]
    HierarchyRequest,
    /// The node belongs to a different window.
    #[error("the node belongs to a different window")]
    WrongDocument,
    /// The node cannot host a shadow root, or already hosts one.
    #[error("the node does not support this operation")]
    NotSupported,
}
