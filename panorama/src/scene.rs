use crate::{canvas::Projection, PanoramaError, PointOfInterest, ViewParameters};
use terrain::HorizonProfile;

/// Everything a render needs, fixed once the horizon is known.
#[derive(Debug, Clone)]
pub struct Scene {
    view: ViewParameters,
    profile: HorizonProfile,
    pois: Vec<PointOfInterest>,
}

impl Scene {
    /// Fails if the profile does not have exactly one record per
    /// canvas column.
    pub fn new(
        view: ViewParameters,
        profile: HorizonProfile,
        pois: Vec<PointOfInterest>,
    ) -> Result<Self, PanoramaError> {
        if profile.len() != view.width as usize {
            return Err(PanoramaError::InvalidViewParameters(format!(
                "profile has {} columns, canvas is {} wide",
                profile.len(),
                view.width
            )));
        }
        Ok(Self { view, profile, pois })
    }

    pub fn view(&self) -> &ViewParameters {
        &self.view
    }

    pub fn profile(&self) -> &HorizonProfile {
        &self.profile
    }

    pub fn pois(&self) -> &[PointOfInterest] {
        &self.pois
    }

    pub fn projection(&self) -> Projection {
        self.view.projection()
    }

    /// Eye altitude all apparent angles are measured from, meters.
    pub fn observer_altitude_m(&self) -> f64 {
        self.profile.observer_altitude_m()
    }
}
