//! QoS compatibility negotiation.
//!
//! Pure decision procedure between what an entrypoint requires and what an
//! endpoint connector declares. Produces a controlled failure payload on
//! every mismatch; connecting proceeds only on full compatibility.

use std::collections::HashSet;

use crate::connector::{QosCapability, QosRequirement};
use crate::context::ExecutionFailure;
use crate::endpoint::managed::ManagedEndpoint;

pub const INVALID_QOS_CONFIGURATION_KEY: &str = "INVALID_QOS_CONFIGURATION";
pub const INCOMPATIBLE_QOS_KEY: &str = "INCOMPATIBLE_QOS";
pub const INCOMPATIBLE_QOS_CAPABILITIES_KEY: &str = "INCOMPATIBLE_QOS_CAPABILITIES";

/// Check that the endpoint can satisfy the entrypoint's QoS requirement.
pub fn check_compatibility(requirement: Option<&QosRequirement>, endpoint: &ManagedEndpoint) -> Result<(), ExecutionFailure> {
    let (requirement, supported) = match (requirement, endpoint.supported_qos()) {
        (Some(requirement), Some(supported)) => (requirement, supported),
        // One side declared nothing negotiable: a configuration defect.
        _ => {
            return Err(ExecutionFailure::new(
                500,
                INVALID_QOS_CONFIGURATION_KEY,
                "Entrypoint or endpoint connector declares no QoS contract",
            ));
        }
    };

    if !supported.contains(&requirement.qos) {
        return Err(ExecutionFailure::new(
            400,
            INCOMPATIBLE_QOS_KEY,
            "Incompatible QoS between entrypoint and endpoint",
        ));
    }

    // A missing supported-capabilities set means the endpoint supports none.
    let empty = HashSet::new();
    let supported_capabilities: &HashSet<QosCapability> =
        endpoint.supported_qos_capabilities().unwrap_or(&empty);
    if !requirement.capabilities.iter().all(|capability| supported_capabilities.contains(capability)) {
        return Err(ExecutionFailure::new(
            400,
            INCOMPATIBLE_QOS_CAPABILITIES_KEY,
            "Incompatible QoS capabilities between entrypoint and endpoint",
        ));
    }

    Ok(())
}
