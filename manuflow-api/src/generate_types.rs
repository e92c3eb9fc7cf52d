//! TypeScript type generation module.
//!
//! Exports TypeScript definitions for the API's request and response types.
//! Running the test writes one `.ts` file per type into the output
//! directory.

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    use ts_rs::TS;

    #[test]
    fn generate_typescript_types() {
        // Output directory, in order of preference:
        // 1. Environment variable MANUFLOW_TS_OUTPUT_DIR
        // 2. ../../web/src/types/generated (if the web project is checked out)
        // 3. ../ts-bindings
        let output_dir_str = if let Ok(env_dir) = env::var("MANUFLOW_TS_OUTPUT_DIR") {
            println!("Using TypeScript output directory from MANUFLOW_TS_OUTPUT_DIR: {}", env_dir);
            env_dir
        } else {
            let web_dir = "../../web/src/types/generated";
            let fallback_dir = "../ts-bindings";

            if Path::new(web_dir).parent().unwrap_or(Path::new("")).exists() {
                println!("Using web project directory: {}", web_dir);
                web_dir.to_string()
            } else {
                println!("Using fallback directory: {}", fallback_dir);
                fallback_dir.to_string()
            }
        };

        let output_dir = Path::new(&output_dir_str);
        std::fs::create_dir_all(output_dir).expect("Failed to create output directory");

        // Remove stale definitions of renamed or deleted types
        for entry in std::fs::read_dir(output_dir).expect("Failed to read output directory") {
            let path = entry.expect("Failed to read directory entry").path();
            if path.extension().and_then(|s| s.to_str()) == Some("ts") {
                std::fs::remove_file(&path).unwrap_or_else(|e| panic!("Failed to remove {:?}: {}", path, e));
            }
        }

        unsafe {
            env::set_var("TS_RS_EXPORT_DIR", output_dir);
        }

        use crate::api::company::{CreateCompanyRequest, CreateCompanyResponse, SubscriptionRequest};
        use crate::api::login::{LoginRequest, SessionInfo};
        use crate::api::status::HealthStatus;
        use crate::api::user::{CreateUserRequest, UpdateUserRequest, UserContractsRequest};
        use crate::error::ErrorResponse;
        use crate::models::*;

        // Shared
        ErrorResponse::export().expect("Failed to export ErrorResponse type");
        HealthStatus::export().expect("Failed to export HealthStatus type");

        // Auth and tenants
        LoginRequest::export().expect("Failed to export LoginRequest type");
        SessionInfo::export().expect("Failed to export SessionInfo type");
        User::export().expect("Failed to export User type");
        UserRole::export().expect("Failed to export UserRole type");
        CreateUserRequest::export().expect("Failed to export CreateUserRequest type");
        UpdateUserRequest::export().expect("Failed to export UpdateUserRequest type");
        UserContractsRequest::export().expect("Failed to export UserContractsRequest type");
        Company::export().expect("Failed to export Company type");
        CompanySummary::export().expect("Failed to export CompanySummary type");
        SubscriptionPlan::export().expect("Failed to export SubscriptionPlan type");
        SubscriptionStatus::export().expect("Failed to export SubscriptionStatus type");
        CreateCompanyRequest::export().expect("Failed to export CreateCompanyRequest type");
        CreateCompanyResponse::export().expect("Failed to export CreateCompanyResponse type");
        SubscriptionRequest::export().expect("Failed to export SubscriptionRequest type");

        // Contracts and assets
        Contract::export().expect("Failed to export Contract type");
        ContractInput::export().expect("Failed to export ContractInput type");
        ContractChanges::export().expect("Failed to export ContractChanges type");
        Asset::export().expect("Failed to export Asset type");
        AssetStatus::export().expect("Failed to export AssetStatus type");
        AssetInput::export().expect("Failed to export AssetInput type");
        AssetChanges::export().expect("Failed to export AssetChanges type");
        AssetScript::export().expect("Failed to export AssetScript type");
        AssetScriptStep::export().expect("Failed to export AssetScriptStep type");
        AssetScriptInput::export().expect("Failed to export AssetScriptInput type");
        AssetScriptWithSteps::export().expect("Failed to export AssetScriptWithSteps type");
        StepTemplateInput::export().expect("Failed to export StepTemplateInput type");

        // Inspections, schedules and rondas
        WorkStatus::export().expect("Failed to export WorkStatus type");
        Inspection::export().expect("Failed to export Inspection type");
        InspectionStep::export().expect("Failed to export InspectionStep type");
        InspectionInput::export().expect("Failed to export InspectionInput type");
        InspectionWithSteps::export().expect("Failed to export InspectionWithSteps type");
        StepUpdateInput::export().expect("Failed to export StepUpdateInput type");
        Shift::export().expect("Failed to export Shift type");
        InspectionSchedule::export().expect("Failed to export InspectionSchedule type");
        ScheduleStep::export().expect("Failed to export ScheduleStep type");
        ScheduleInput::export().expect("Failed to export ScheduleInput type");
        ScheduleUpdateInput::export().expect("Failed to export ScheduleUpdateInput type");
        ScheduleWithSteps::export().expect("Failed to export ScheduleWithSteps type");
        ScheduledInspection::export().expect("Failed to export ScheduledInspection type");
        ScheduledInspectionStep::export().expect("Failed to export ScheduledInspectionStep type");
        RondaDetail::export().expect("Failed to export RondaDetail type");

        // Reports and alerts
        ReportStatus::export().expect("Failed to export ReportStatus type");
        Report::export().expect("Failed to export Report type");
        ReportInput::export().expect("Failed to export ReportInput type");
        ReportChanges::export().expect("Failed to export ReportChanges type");
        ReportStatusInput::export().expect("Failed to export ReportStatusInput type");
        ReportColumn::export().expect("Failed to export ReportColumn type");
        EmailStatus::export().expect("Failed to export EmailStatus type");
        EmailRecord::export().expect("Failed to export EmailRecord type");
        ExpirationSummary::export().expect("Failed to export ExpirationSummary type");

        // Meters
        DeviceKind::export().expect("Failed to export DeviceKind type");
        MeasurementDevice::export().expect("Failed to export MeasurementDevice type");
        MeasurementDeviceInput::export().expect("Failed to export MeasurementDeviceInput type");
        MeasurementDeviceChanges::export().expect("Failed to export MeasurementDeviceChanges type");
        MeasurementEntry::export().expect("Failed to export MeasurementEntry type");
        MeasurementEntryInput::export().expect("Failed to export MeasurementEntryInput type");
        MeasurementEntryWithConsumption::export()
            .expect("Failed to export MeasurementEntryWithConsumption type");

        // Relevant items
        RelevantItemStatus::export().expect("Failed to export RelevantItemStatus type");
        Priority::export().expect("Failed to export Priority type");
        RelevantItem::export().expect("Failed to export RelevantItem type");
        RelevantItemInput::export().expect("Failed to export RelevantItemInput type");
        RelevantItemChanges::export().expect("Failed to export RelevantItemChanges type");
        RelevantItemStatusInput::export().expect("Failed to export RelevantItemStatusInput type");
        RelevantItemColumn::export().expect("Failed to export RelevantItemColumn type");
        RelevantItemAttachment::export().expect("Failed to export RelevantItemAttachment type");

        // Dashboard
        DashboardSummary::export().expect("Failed to export DashboardSummary type");
        RondaCounts::export().expect("Failed to export RondaCounts type");

        println!("TypeScript types generated successfully in {:?}", output_dir);
    }
}
