// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Value objects: small, validated, immutable types with no identity of
//! their own. Every field on [`crate::entities::Event`] that carries a
//! closed vocabulary or a parseable shape gets its own type here so that
//! invalid values cannot be constructed in the first place.

mod access_zone;
mod category;
mod confidence;
mod event_id;
mod group_key;
mod ip_cidr;
mod lifecycle_tag;
mod org_id;
mod restriction;
mod routing_key;
mod routing_state;
mod series_id;
mod source;

pub use access_zone::AccessZone;
pub use category::Category;
pub use confidence::Confidence;
pub use event_id::EventId;
pub use group_key::GroupKey;
pub use ip_cidr::IpCidr;
pub use lifecycle_tag::LifecycleTag;
pub use org_id::OrgId;
pub use restriction::Restriction;
pub use routing_key::{binding_patterns_for, matches_binding, RoutingKey};
pub use routing_state::RoutingState;
pub use series_id::SeriesId;
pub use source::Source;
