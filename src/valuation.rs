// 🔮 Valuation flow - encode, predict, then record in the audit log
//
// A logging failure after a successful prediction never hides the estimate:
// it comes back as `audit_warning` next to the price.

use crate::audit::{NewAuditEntry, PredictionAuditLog};
use crate::error::{Error, Result};
use crate::features::{FeatureEncoding, FeatureVector, PropertyForm};
use crate::money::lacs_to_rupees;
use crate::predictor::Predictor;
use crate::session::SessionController;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct PredictionOutcome {
    pub price_lacs: f64,
    pub price_inr: f64,
    pub features: FeatureVector,
    /// Set when the estimate could not be written to history
    #[serde(skip)]
    pub audit_warning: Option<Error>,
}

impl PredictionOutcome {
    pub fn recorded(&self) -> bool {
        self.audit_warning.is_none()
    }
}

pub struct ValuationService<'a, P: Predictor> {
    predictor: &'a P,
    audit_log: &'a PredictionAuditLog,
    encoding: FeatureEncoding,
}

impl<'a, P: Predictor> ValuationService<'a, P> {
    pub fn new(predictor: &'a P, audit_log: &'a PredictionAuditLog) -> Self {
        Self::with_encoding(predictor, audit_log, FeatureEncoding::default())
    }

    pub fn with_encoding(
        predictor: &'a P,
        audit_log: &'a PredictionAuditLog,
        encoding: FeatureEncoding,
    ) -> Self {
        ValuationService {
            predictor,
            audit_log,
            encoding,
        }
    }

    /// Estimate a price for the signed-in user and log it.
    ///
    /// The form is only borrowed, so the caller still has it for a retry
    /// after a `PredictionFailure`.
    pub fn submit(&self, session: &SessionController, form: &PropertyForm) -> Result<PredictionOutcome> {
        let username = session.username().ok_or(Error::NotAuthenticated)?;

        let features = self.encoding.encode(form)?;
        let price_lacs = self.estimate(&features)?;

        info!(
            interaction = %session.interaction_id(),
            username,
            price_lacs,
            city = %form.city,
            "estimate computed"
        );

        let entry = NewAuditEntry {
            username,
            price_estimate: price_lacs,
            city: &form.city,
            area: &form.area,
            features: &features,
        };
        let audit_warning = match self.audit_log.append(&entry) {
            Ok(_) => None,
            Err(e) => {
                warn!(
                    interaction = %session.interaction_id(),
                    username,
                    error = %e,
                    "failed to record prediction"
                );
                Some(Error::AuditLogWrite(e.to_string()))
            }
        };

        Ok(PredictionOutcome {
            price_lacs,
            price_inr: lacs_to_rupees(price_lacs),
            features,
            audit_warning,
        })
    }

    fn estimate(&self, features: &FeatureVector) -> Result<f64> {
        if self.predictor.encoding_version() != self.encoding.version {
            return Err(Error::PredictionFailure(format!(
                "model expects encoding '{}' but inputs use '{}'",
                self.predictor.encoding_version(),
                self.encoding.version
            )));
        }

        let price = self
            .predictor
            .predict(features)
            .map_err(|e| Error::PredictionFailure(e.to_string()))?;

        if !price.is_finite() || price < 0.0 {
            return Err(Error::PredictionFailure(format!(
                "invalid estimate {}",
                price
            )));
        }
        Ok(price)
    }
}
