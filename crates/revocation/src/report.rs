//! Aggregate result of one suspension fan-out.

use serde::{Serialize, Serializer};

use signon_accounts::Application;
use signon_core::{ApplicationId, UserId};

use crate::RevocationOutcome;

/// One application whose revocation failed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevocationFailure {
    #[serde(serialize_with = "serialize_application")]
    pub application: Application,
    pub reason: String,
}

/// Applications are serialized by id and name only; contracts carry credentials.
#[derive(Serialize)]
struct ApplicationRef<'a> {
    id: ApplicationId,
    name: &'a str,
}

impl<'a> From<&'a Application> for ApplicationRef<'a> {
    fn from(application: &'a Application) -> Self {
        Self {
            id: application.id,
            name: &application.name,
        }
    }
}

fn serialize_application<S: Serializer>(application: &Application, s: S) -> Result<S::Ok, S::Error> {
    ApplicationRef::from(application).serialize(s)
}

fn serialize_applications<S: Serializer>(applications: &[Application], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(applications.iter().map(ApplicationRef::from))
}

/// Which applications revoked the user's access and which still may hold it.
///
/// Both partitions keep the order of the application list the report was
/// built from, whatever order the revocation calls completed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspensionReport {
    pub user_id: UserId,
    #[serde(serialize_with = "serialize_applications")]
    successes: Vec<Application>,
    failures: Vec<RevocationFailure>,
    #[serde(skip)]
    order: Vec<ApplicationId>,
}

impl SuspensionReport {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            successes: Vec::new(),
            failures: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Partitions `(application, outcome)` pairs, keeping their order.
    pub fn from_outcomes<I>(user_id: UserId, outcomes: I) -> Self
    where
        I: IntoIterator<Item = (Application, RevocationOutcome)>,
    {
        let mut report = Self::empty(user_id);
        for (application, outcome) in outcomes {
            report.order.push(application.id);
            match outcome {
                RevocationOutcome::Success => report.successes.push(application),
                RevocationOutcome::Failure { reason, .. } => {
                    report.failures.push(RevocationFailure {
                        application,
                        reason,
                    })
                }
            }
        }
        report
    }

    pub fn successes(&self) -> &[Application] {
        &self.successes
    }

    pub fn failures(&self) -> &[RevocationFailure] {
        &self.failures
    }

    /// Applications whose revocation failed, in report order.
    pub fn failed_applications(&self) -> Vec<Application> {
        self.failures.iter().map(|f| f.application.clone()).collect()
    }

    /// True when no application is left holding stale access.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Folds the result of retrying some of this report's failures back in.
    ///
    /// Applications that succeeded on retry move to `successes`; those that
    /// failed again keep their newest reason. Applications absent from
    /// `retry` are left as they were. Ordering still follows this report's
    /// original application list.
    pub fn merge_retry(self, retry: SuspensionReport) -> SuspensionReport {
        let position = |id: &ApplicationId| {
            self.order
                .iter()
                .position(|o| o == id)
                .unwrap_or(usize::MAX)
        };

        let mut successes = self.successes.clone();
        let mut failures: Vec<RevocationFailure> = Vec::with_capacity(self.failures.len());

        for failure in &self.failures {
            let id = failure.application.id;
            if let Some(app) = retry.successes.iter().find(|a| a.id == id) {
                successes.push(app.clone());
            } else if let Some(again) = retry.failures.iter().find(|f| f.application.id == id) {
                failures.push(again.clone());
            } else {
                failures.push(failure.clone());
            }
        }

        successes.sort_by_key(|a| position(&a.id));
        failures.sort_by_key(|f| position(&f.application.id));

        SuspensionReport {
            user_id: self.user_id,
            successes,
            failures,
            order: self.order.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use signon_accounts::RevocationContract;

    use super::*;

    fn app(name: &str) -> Application {
        Application::new(
            ApplicationId::new(),
            name,
            RevocationContract::new(format!("https://{}.example.com/callback", name.to_lowercase())),
        )
        .unwrap()
    }

    fn fail(app: &Application, reason: &str) -> RevocationOutcome {
        RevocationOutcome::failure(app.id, reason)
    }

    #[test]
    fn empty_outcomes_make_an_empty_report() {
        let report = SuspensionReport::from_outcomes(UserId::new(), Vec::new());
        assert!(report.successes().is_empty());
        assert!(report.failures().is_empty());
        assert!(report.is_complete());
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn partitions_keep_input_order() {
        let (a, b, c) = (app("AppA"), app("AppB"), app("AppC"));
        let report = SuspensionReport::from_outcomes(
            UserId::new(),
            vec![
                (a.clone(), RevocationOutcome::Success),
                (b.clone(), fail(&b, "connection refused")),
                (c.clone(), RevocationOutcome::Success),
            ],
        );

        assert_eq!(report.successes(), &[a, c]);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].application, b);
        assert_eq!(report.failures()[0].reason, "connection refused");
        assert!(!report.is_complete());
    }

    #[test]
    fn merge_retry_moves_recovered_applications_in_original_order() {
        let (a, b, c, d) = (app("A"), app("B"), app("C"), app("D"));
        let user_id = UserId::new();
        let original = SuspensionReport::from_outcomes(
            user_id,
            vec![
                (a.clone(), fail(&a, "timeout")),
                (b.clone(), RevocationOutcome::Success),
                (c.clone(), fail(&c, "timeout")),
                (d.clone(), fail(&d, "unexpected status 503")),
            ],
        );

        let retry = SuspensionReport::from_outcomes(
            user_id,
            vec![
                (a.clone(), RevocationOutcome::Success),
                (c.clone(), fail(&c, "unexpected status 500")),
            ],
        );

        let merged = original.merge_retry(retry);

        assert_eq!(merged.successes(), &[a, b]);
        let failed: Vec<(&str, &str)> = merged
            .failures()
            .iter()
            .map(|f| (f.application.name.as_str(), f.reason.as_str()))
            .collect();
        assert_eq!(
            failed,
            vec![("C", "unexpected status 500"), ("D", "unexpected status 503")]
        );
        assert_eq!(merged.total(), 4);
    }

    #[test]
    fn serializes_both_partitions_without_credentials() {
        let published = app("Publisher");
        let secret = Application::new(
            ApplicationId::new(),
            "Licensing",
            RevocationContract::new("https://licensing.example.com/callback").with_bearer_token("s3cr3t"),
        )
        .unwrap();
        let report = SuspensionReport::from_outcomes(
            UserId::new(),
            vec![
                (published.clone(), RevocationOutcome::Success),
                (secret.clone(), fail(&secret, "timeout")),
            ],
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["successes"][0], serde_json::json!({
            "id": published.id,
            "name": "Publisher",
        }));
        assert_eq!(json["failures"][0]["reason"], "timeout");
        assert_eq!(json["failures"][0]["application"]["name"], "Licensing");
        assert!(json["failures"][0]["application"].get("contract").is_none());
        assert!(json.get("order").is_none());

        let text = serde_json::to_string(&report).unwrap();
        assert!(!text.contains("s3cr3t"));
        assert!(!text.contains("bearer_token"));
    }

    proptest! {
        #[test]
        fn every_application_lands_in_exactly_one_partition(mask in prop::collection::vec(any::<bool>(), 0..24)) {
            let apps: Vec<Application> = (0..mask.len()).map(|i| app(&format!("App{i}"))).collect();
            let outcomes = apps.iter().zip(&mask).map(|(a, ok)| {
                let outcome = if *ok { RevocationOutcome::Success } else { fail(a, "boom") };
                (a.clone(), outcome)
            });

            let report = SuspensionReport::from_outcomes(UserId::new(), outcomes);

            prop_assert_eq!(report.total(), apps.len());

            let expected_successes: Vec<Application> = apps.iter().zip(&mask)
                .filter(|(_, ok)| **ok).map(|(a, _)| a.clone()).collect();
            let expected_failures: Vec<Application> = apps.iter().zip(&mask)
                .filter(|(_, ok)| !**ok).map(|(a, _)| a.clone()).collect();

            prop_assert_eq!(report.successes(), expected_successes.as_slice());
            prop_assert_eq!(report.failed_applications(), expected_failures);
        }
    }
}
