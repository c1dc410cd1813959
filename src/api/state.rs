use crate::service::AcquisitionService;

/// Request bodies above this are rejected before decoding.
pub const DEFAULT_MAX_PAYLOAD: usize = 5 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: AcquisitionService,
    pub max_payload: usize,
}

impl AppState {
    pub fn new(service: AcquisitionService) -> Self {
        Self {
            service,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}
