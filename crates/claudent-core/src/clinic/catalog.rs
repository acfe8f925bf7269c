//! Service and package catalog operations.

use super::{require, Clinic, ClinicError, ClinicResult};
use crate::models::{Package, RecordStatus, Service};
use crate::store::CollectionPath;

const SERVICES: &str = "services";
const PACKAGES: &str = "packages";

impl Clinic {
    pub fn create_service(&self, service: &Service) -> ClinicResult<String> {
        validate_service(service)?;
        self.create(
            &CollectionPath::services(),
            service,
            SERVICES,
            &format!("Created service {} ({})", service.name, service.code),
        )
    }

    pub fn get_service(&self, id: &str) -> ClinicResult<Option<Service>> {
        self.fetch(&CollectionPath::services().doc(id))
    }

    /// All services ordered by category then name.
    pub fn list_services(&self) -> ClinicResult<Vec<Service>> {
        let mut services: Vec<Service> = self.fetch_all(&CollectionPath::services())?;
        services.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
        Ok(services)
    }

    /// Services that can be added to new quotations.
    pub fn active_services(&self) -> ClinicResult<Vec<Service>> {
        Ok(self
            .list_services()?
            .into_iter()
            .filter(|s| s.status == RecordStatus::Active)
            .collect())
    }

    pub fn update_service(&self, service: &Service) -> ClinicResult<()> {
        validate_service(service)?;
        self.replace(
            &CollectionPath::services().doc(service.id.as_str()),
            service,
            SERVICES,
            &format!("Updated service {} ({})", service.name, service.code),
        )
    }

    pub fn delete_service(&self, id: &str) -> ClinicResult<()> {
        self.remove(
            &CollectionPath::services().doc(id),
            SERVICES,
            &format!("Deleted service {}", id),
        )
    }

    pub fn create_package(&self, package: &Package) -> ClinicResult<String> {
        validate_package(package)?;
        self.create(
            &CollectionPath::packages(),
            package,
            PACKAGES,
            &format!("Created package {}", package.name),
        )
    }

    pub fn get_package(&self, id: &str) -> ClinicResult<Option<Package>> {
        self.fetch(&CollectionPath::packages().doc(id))
    }

    /// All packages, latest validity window first.
    pub fn list_packages(&self) -> ClinicResult<Vec<Package>> {
        let mut packages: Vec<Package> = self.fetch_all(&CollectionPath::packages())?;
        packages.sort_by(|a, b| b.starts_on.cmp(&a.starts_on));
        Ok(packages)
    }

    /// Packages on sale on `day` (YYYY-MM-DD).
    pub fn packages_valid_on(&self, day: &str) -> ClinicResult<Vec<Package>> {
        Ok(self
            .list_packages()?
            .into_iter()
            .filter(|p| p.is_valid_on(day))
            .collect())
    }

    pub fn update_package(&self, package: &Package) -> ClinicResult<()> {
        validate_package(package)?;
        self.replace(
            &CollectionPath::packages().doc(package.id.as_str()),
            package,
            PACKAGES,
            &format!("Updated package {}", package.name),
        )
    }

    pub fn delete_package(&self, id: &str) -> ClinicResult<()> {
        self.remove(
            &CollectionPath::packages().doc(id),
            PACKAGES,
            &format!("Deleted package {}", id),
        )
    }
}

fn validate_service(service: &Service) -> ClinicResult<()> {
    require(&service.name, "Service name")?;
    if !service.price.is_finite() || service.price < 0.0 {
        return Err(ClinicError::InvalidInput("Price must be zero or more".into()));
    }
    Ok(())
}

fn validate_package(package: &Package) -> ClinicResult<()> {
    require(&package.name, "Package name")?;
    if package.items.is_empty() {
        return Err(ClinicError::InvalidInput("A package needs at least one service".into()));
    }
    if package.ends_on < package.starts_on {
        return Err(ClinicError::InvalidInput("Package ends before it starts".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::clinic;
    use super::*;
    use crate::models::PackageItem;

    fn make_service(code: &str, name: &str, category: &str, price: f64) -> Service {
        Service {
            id: String::new(),
            code: code.into(),
            name: name.into(),
            description: String::new(),
            price,
            category: category.into(),
            status: RecordStatus::Active,
        }
    }

    fn make_package(name: &str, starts_on: &str, ends_on: &str) -> Package {
        Package {
            id: String::new(),
            name: name.into(),
            total_price: 900.0,
            starts_on: starts_on.into(),
            ends_on: ends_on.into(),
            items: vec![PackageItem {
                service_id: "svc-1".into(),
                name: "Prophylaxis".into(),
                original_price: 500.0,
                quantity: 2,
            }],
            status: RecordStatus::Active,
        }
    }

    #[test]
    fn test_service_catalog() {
        let clinic = clinic();
        clinic.create_service(&make_service("END-1", "Root canal", "Endodontics", 3500.0)).unwrap();
        let id = clinic.create_service(&make_service("PRE-1", "Cleaning", "Prevention", 500.0)).unwrap();
        clinic.create_service(&make_service("END-2", "Apicoectomy", "Endodontics", 4200.0)).unwrap();

        let names: Vec<String> = clinic.list_services().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Apicoectomy", "Root canal", "Cleaning"]);

        let mut cleaning = clinic.get_service(&id).unwrap().unwrap();
        cleaning.status = RecordStatus::Inactive;
        clinic.update_service(&cleaning).unwrap();
        assert_eq!(clinic.active_services().unwrap().len(), 2);

        clinic.delete_service(&id).unwrap();
        assert_eq!(clinic.list_services().unwrap().len(), 2);
    }

    #[test]
    fn test_service_rejects_negative_price() {
        let clinic = clinic();
        let result = clinic.create_service(&make_service("X", "Bad", "Misc", -1.0));
        assert!(matches!(result, Err(ClinicError::InvalidInput(_))));
    }

    #[test]
    fn test_packages() {
        let clinic = clinic();
        clinic.create_package(&make_package("Winter", "2026-01-01", "2026-03-31")).unwrap();
        clinic.create_package(&make_package("Summer", "2026-06-01", "2026-08-31")).unwrap();

        let packages = clinic.list_packages().unwrap();
        assert_eq!(packages[0].name, "Summer");
        assert_eq!(clinic.packages_valid_on("2026-02-14").unwrap().len(), 1);
        assert!(clinic.packages_valid_on("2026-05-01").unwrap().is_empty());

        let inverted = make_package("Broken", "2026-05-01", "2026-04-01");
        assert!(matches!(clinic.create_package(&inverted), Err(ClinicError::InvalidInput(_))));
    }
}
