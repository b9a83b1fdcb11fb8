//! Common - Shared Types and Utilities for the Crosschain Bridge Contracts
//!
//! This package provides the asset description shared by the bridge contract
//! and its tests: which local asset backs an external token and how to move it.

pub mod asset;

pub use asset::AssetInfo;
