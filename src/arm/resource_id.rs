use std::fmt;

/// Identifier of a Resource Manager resource, e.g.
/// `/subscriptions/{id}/resourceGroups/{name}/providers/Microsoft.Sql/servers/{name}`.
///
/// Identifiers are constructed locally; nothing is queried to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    segments: Vec<String>,
}

impl ResourceId {
    pub fn subscription(subscription_id: &str) -> Self {
        Self {
            segments: vec!["subscriptions".to_string(), subscription_id.to_string()],
        }
    }

    pub fn resource_group(subscription_id: &str, resource_group_name: &str) -> Self {
        Self::subscription(subscription_id).child("resourceGroups", resource_group_name)
    }

    /// Resource of a provider under this scope. `resource_type` is `Namespace/type`, e.g.
    /// `Microsoft.Storage/storageAccounts`.
    pub fn provider_resource(&self, resource_type: &str, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push("providers".to_string());
        segments.extend(resource_type.split('/').map(str::to_string));
        segments.push(name.to_string());
        Self { segments }
    }

    pub fn child(&self, kind: &str, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(kind.to_string());
        segments.push(name.to_string());
        Self { segments }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
