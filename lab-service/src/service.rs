use chrono::Utc;
use logger_redacted::redact_phone;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LabError, LabResult};
use crate::models::*;
use crate::repository::LabRepository;

/// Attempts at claiming a generated order number before giving up
const ORDER_NUMBER_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct LabService {
    repo: Arc<dyn LabRepository>,
}

impl LabService {
    pub fn new(repo: Arc<dyn LabRepository>) -> Self {
        Self { repo }
    }

    /// Public lookup. Both the order number and the phone must match; every
    /// mismatch reports the same `NotFound`.
    pub async fn lookup(&self, phone: &str, order_number: &str) -> LabResult<LabLookupResult> {
        let order_number = order_number.trim();
        validate_order_number(order_number)?;
        let phone = normalize_phone(phone);
        if phone.is_empty() {
            return Err(LabError::validation("phone is required"));
        }

        let order = self
            .repo
            .find_by_order_number(order_number)
            .await?
            .filter(|o| o.patient_phone == phone);

        match order {
            Some(order) => {
                info!(order_number, status = %order.status, "Lab result looked up");
                Ok(order.into())
            }
            None => {
                debug!(order_number, phone = %redact_phone(&phone), "Lab lookup did not match");
                Err(LabError::NotFound)
            }
        }
    }

    /// Store an order, generating the next order number for today when none
    /// is given
    pub async fn record_result(&self, clinic_id: Uuid, req: RecordLabResultRequest) -> LabResult<LabOrder> {
        let patient_name = req.patient_name.trim().to_string();
        let test_name = req.test_name.trim().to_string();
        if patient_name.is_empty() || test_name.is_empty() {
            return Err(LabError::validation("patient name and test name are required"));
        }
        let patient_phone = normalize_phone(&req.patient_phone);
        if patient_phone.len() < 7 {
            return Err(LabError::validation("phone number is malformed"));
        }

        let now = Utc::now();
        let explicit = match req.order_number {
            Some(number) => {
                let number = number.trim().to_string();
                validate_order_number(&number)?;
                Some(number)
            }
            None => None,
        };

        let completed = req.status == LabOrderStatus::Completed;
        let mut order = LabOrder {
            id: Uuid::new_v4(),
            clinic_id,
            order_number: explicit.clone().unwrap_or_default(),
            patient_name,
            patient_phone,
            test_name,
            status: req.status,
            results: req.results,
            ordered_at: now,
            completed_at: completed.then_some(now),
        };

        let order = match explicit {
            Some(_) => self.repo.insert_order(order).await?,
            None => {
                let prefix = format!("LAB-{}-", now.format("%Y%m%d"));
                let mut attempt = 1;
                loop {
                    let highest = self.repo.max_sequence_with_prefix(&prefix).await?;
                    order.order_number = next_order_number(now.date_naive(), highest + 1)?;
                    match self.repo.insert_order(order.clone()).await {
                        Err(LabError::DuplicateOrder(taken)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                            warn!(%clinic_id, order_number = %taken, attempt, "Generated order number taken, retrying");
                            attempt += 1;
                        }
                        other => break other?,
                    }
                }
            }
        };

        info!(%clinic_id, order_number = %order.order_number, status = %order.status, "Lab order recorded");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryLabRepository;

    fn service() -> LabService {
        LabService::new(Arc::new(InMemoryLabRepository::new()))
    }

    fn request(order_number: Option<&str>, status: LabOrderStatus) -> RecordLabResultRequest {
        RecordLabResultRequest {
            order_number: order_number.map(str::to_string),
            patient_name: "Kamala Tamang".to_string(),
            patient_phone: "+977 9812345678".to_string(),
            test_name: "Lipid profile".to_string(),
            status,
            results: vec![LabResultValue {
                parameter: "LDL".to_string(),
                value: "162".to_string(),
                unit: Some("mg/dL".to_string()),
                reference_range: Some("<130".to_string()),
                flag: Some("H".to_string()),
            }],
        }
    }

    #[tokio::test]
    async fn lookup_requires_matching_phone() {
        let svc = service();
        svc.record_result(Uuid::new_v4(), request(Some("LAB-20240301-0001"), LabOrderStatus::Completed))
            .await
            .unwrap();

        let found = svc.lookup("9812345678", "LAB-20240301-0001").await.unwrap();
        assert_eq!(found.results.unwrap()[0].flag.as_deref(), Some("H"));

        let wrong_phone = svc.lookup("9800000000", "LAB-20240301-0001").await.unwrap_err();
        let wrong_order = svc.lookup("9812345678", "LAB-20240301-0002").await.unwrap_err();
        assert!(matches!(wrong_phone, LabError::NotFound));
        assert!(matches!(wrong_order, LabError::NotFound));
        assert_eq!(wrong_phone.to_string(), wrong_order.to_string());
    }

    #[tokio::test]
    async fn malformed_order_number_is_a_validation_error() {
        let svc = service();
        assert!(matches!(
            svc.lookup("9812345678", "LAB-123").await,
            Err(LabError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn pending_results_are_not_exposed() {
        let svc = service();
        svc.record_result(Uuid::new_v4(), request(Some("LAB-20240301-0002"), LabOrderStatus::Pending))
            .await
            .unwrap();
        let found = svc.lookup("+977-9812345678", "LAB-20240301-0002").await.unwrap();
        assert_eq!(found.status, LabOrderStatus::Pending);
        assert!(found.results.is_none());
    }

    #[tokio::test]
    async fn generated_numbers_are_sequential_and_unique() {
        let svc = service();
        let clinic = Uuid::new_v4();
        let first = svc.record_result(clinic, request(None, LabOrderStatus::Pending)).await.unwrap();
        let second = svc.record_result(clinic, request(None, LabOrderStatus::Pending)).await.unwrap();
        assert!(first.order_number.ends_with("-0001"));
        assert!(second.order_number.ends_with("-0002"));

        let dup = svc
            .record_result(clinic, request(Some(&first.order_number), LabOrderStatus::Pending))
            .await
            .unwrap_err();
        assert!(matches!(dup, LabError::DuplicateOrder(_)));
    }

    #[tokio::test]
    async fn generated_numbers_continue_after_explicit_ones() {
        let svc = service();
        let clinic = Uuid::new_v4();
        let today = Utc::now().format("%Y%m%d");
        let explicit = format!("LAB-{today}-0002");
        svc.record_result(clinic, request(Some(&explicit), LabOrderStatus::Pending))
            .await
            .unwrap();

        let third = svc.record_result(clinic, request(None, LabOrderStatus::Pending)).await.unwrap();
        let fourth = svc.record_result(clinic, request(None, LabOrderStatus::Pending)).await.unwrap();
        assert_eq!(third.order_number, format!("LAB-{today}-0003"));
        assert_eq!(fourth.order_number, format!("LAB-{today}-0004"));
    }

    #[tokio::test]
    async fn concurrent_generated_numbers_do_not_collide() {
        let svc = service();
        let clinic = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.record_result(clinic, request(None, LabOrderStatus::Pending)).await
            }));
        }
        let mut numbers = std::collections::HashSet::new();
        for handle in handles {
            let order = handle.await.unwrap().unwrap();
            assert!(numbers.insert(order.order_number));
        }
        assert_eq!(numbers.len(), 4);
    }
}
