//! Screen implementations, one per [`ScreenId`].

use std::collections::HashMap;

use crate::screen::{Screen, ScreenId};

pub mod dashboard;
pub mod devices;
pub mod diagram;

use dashboard::DashboardScreen;
use devices::DevicesScreen;
use diagram::DiagramScreen;

/// Create all screens, keyed by ScreenId.
pub fn create_screens() -> HashMap<ScreenId, Box<dyn Screen>> {
    let mut screens: HashMap<ScreenId, Box<dyn Screen>> = HashMap::new();
    screens.insert(ScreenId::Dashboard, Box::new(DashboardScreen::new()));
    screens.insert(ScreenId::Diagram, Box::new(DiagramScreen::new()));
    screens.insert(ScreenId::Devices, Box::new(DevicesScreen::new()));
    screens
}
