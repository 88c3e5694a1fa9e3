use crate::error::LocationError;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

pub trait GeolocationProvider: Send + Sync {
    fn request_permission(&self) -> Permission;
    fn current_position(&self) -> Result<Position, LocationError>;
}

/// Permission, then a fix. Denial and fetch failure stay distinguishable.
pub fn locate(provider: &dyn GeolocationProvider) -> Result<Position, LocationError> {
    match provider.request_permission() {
        Permission::Granted => provider.current_position(),
        Permission::Denied => Err(LocationError::Denied),
    }
}

/// Host provider answering from configuration instead of a GPS fix.
pub struct ConfiguredLocation {
    permission: Permission,
    position: Option<Position>,
}

impl ConfiguredLocation {
    pub fn new(permission: Permission, position: Option<Position>) -> Self {
        Self { permission, position }
    }
}

impl GeolocationProvider for ConfiguredLocation {
    fn request_permission(&self) -> Permission {
        self.permission
    }

    fn current_position(&self) -> Result<Position, LocationError> {
        self.position
            .ok_or_else(|| LocationError::Unavailable("no position fix configured".into()))
    }
}
