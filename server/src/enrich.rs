use std::collections::HashMap;

use k8s_openapi::api::core::v1::Pod;
use kube::api::DynamicObject;
use serde_json::Value;
use tracing::{debug, warn};

use crate::network_status::{self, NETWORK_STATUS_ANNOTATION};

pub const VIRTUAL_MACHINE_INSTANCE_KIND: &str = "VirtualMachineInstance";

/// Backfill missing `ips` fields in pod network status annotations from the
/// interface status of the owning virtual machine instance.
///
/// Pods are mutated in place and only in memory. Pods that carry no usable
/// annotation, or whose instance cannot be resolved, are left with the best
/// answer available instead of failing the whole list.
pub fn enrich_pod_list(pods: &mut [Pod], instances: Option<&[DynamicObject]>) {
    for pod in pods.iter_mut() {
        enrich_pod(pod, instances);
    }
}

fn enrich_pod(pod: &mut Pod, instances: Option<&[DynamicObject]>) {
    let pod_name = pod.metadata.name.clone().unwrap_or_default();
    let namespace = pod.metadata.namespace.clone().unwrap_or_default();
    let owner_name = owner_instance_name(pod);

    let Some(annotations) = pod.metadata.annotations.as_mut() else {
        return;
    };
    let Some(annotation) = annotations.get(NETWORK_STATUS_ANNOTATION) else {
        return;
    };
    let Some(mut attachments) = network_status::decode(annotation) else {
        debug!("pod {pod_name} has an unparsable network status annotation, leaving it as is");
        return;
    };

    for attachment in attachments.iter_mut() {
        if attachment.has_ips() {
            continue;
        }
        attachment.set_ips(Vec::new());

        let Some(instances) = instances else { continue };
        let Some(owner_name) = owner_name.as_deref() else {
            continue;
        };
        let Some(instance) = find_instance(instances, &namespace, owner_name) else {
            continue;
        };
        let Some(mapping) = mac_to_ip_mapping(instance) else {
            continue;
        };
        let Some(mac) = attachment.mac() else { continue };
        let Some(ip) = mapping.get(mac) else { continue };

        attachment.set_ips(vec![ip.clone()]);
    }

    match network_status::encode(&attachments) {
        Ok(encoded) => {
            annotations.insert(NETWORK_STATUS_ANNOTATION.to_string(), encoded);
        }
        Err(error) => warn!("pod {pod_name}: failed to encode network status annotation: {error}"),
    }
}

/// Name of the virtual machine instance owning the pod, taken from the first
/// owner reference of that kind.
pub fn owner_instance_name(pod: &Pod) -> Option<String> {
    pod.metadata
        .owner_references
        .as_ref()?
        .iter()
        .find(|owner| owner.kind == VIRTUAL_MACHINE_INSTANCE_KIND)
        .map(|owner| owner.name.clone())
}

/// Instance with the given name in the given namespace. Candidates without a
/// name or namespace never match.
pub fn find_instance<'a>(
    instances: &'a [DynamicObject],
    namespace: &str,
    name: &str,
) -> Option<&'a DynamicObject> {
    instances.iter().find(|instance| {
        instance.metadata.name.as_deref() == Some(name)
            && instance.metadata.namespace.as_deref() == Some(namespace)
    })
}

/// MAC address to IP address mapping from `status.interfaces` of an instance.
///
/// Returns `None` when the status is missing or not shaped like an interface
/// list. Interface entries without both a non-empty `mac` and a non-empty
/// `ipAddress` are skipped.
pub fn mac_to_ip_mapping(instance: &DynamicObject) -> Option<HashMap<String, String>> {
    let interfaces = instance.data.get("status")?.get("interfaces")?.as_array()?;

    let mut mapping = HashMap::new();
    for interface in interfaces {
        let Some(mac) = interface
            .get("mac")
            .and_then(Value::as_str)
            .filter(|mac| !mac.is_empty())
        else {
            continue;
        };
        let Some(ip) = interface
            .get("ipAddress")
            .and_then(Value::as_str)
            .filter(|ip| !ip.is_empty())
        else {
            continue;
        };

        mapping.insert(mac.to_string(), ip.to_string());
    }

    Some(mapping)
}
