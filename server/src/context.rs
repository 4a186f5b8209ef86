use k8s_openapi::api::core::v1::{Node, Pod, Service};
use k8s_openapi::List;
use kube::api::{ApiResource, DynamicObject, ListParams};

use crate::{Error, Result};

/// Coordinates of KubeVirt's VirtualMachineInstance custom resource.
fn virtual_machine_instance_resource() -> ApiResource {
    ApiResource {
        group: "kubevirt.io".into(),
        version: "v1".into(),
        api_version: "kubevirt.io/v1".into(),
        kind: "VirtualMachineInstance".into(),
        plural: "virtualmachineinstances".into(),
    }
}

pub struct Context {
    client: kube::Client,
}

impl Context {
    pub async fn new() -> anyhow::Result<Self> {
        let client = kube::Client::try_default().await?;
        Ok(Self { client })
    }

    #[cfg(test)]
    pub(crate) fn test(client: kube::Client) -> Self {
        Self { client }
    }

    pub async fn pods(&self) -> Result<List<Pod>> {
        let pods = kube::Api::<Pod>::all(self.client.clone())
            .list(&ListParams::default())
            .await
            .map_err(Error::KubeError)?;

        Ok(List {
            items: pods.items,
            metadata: pods.metadata,
        })
    }

    pub async fn services(&self) -> Result<List<Service>> {
        let services = kube::Api::<Service>::all(self.client.clone())
            .list(&ListParams::default())
            .await
            .map_err(Error::KubeError)?;

        Ok(List {
            items: services.items,
            metadata: services.metadata,
        })
    }

    pub async fn nodes(&self) -> Result<List<Node>> {
        let nodes = kube::Api::<Node>::all(self.client.clone())
            .list(&ListParams::default())
            .await
            .map_err(Error::KubeError)?;

        Ok(List {
            items: nodes.items,
            metadata: nodes.metadata,
        })
    }

    pub async fn virtual_machine_instances(&self) -> Result<Vec<DynamicObject>> {
        let instances = kube::Api::<DynamicObject>::all_with(
            self.client.clone(),
            &virtual_machine_instance_resource(),
        )
        .list(&ListParams::default())
        .await
        .map_err(Error::KubeError)?;

        Ok(instances.items)
    }
}
