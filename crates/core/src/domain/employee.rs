use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub address: Address,
    pub contact_details: ContactDetails,
    pub job_details: JobDetails,
    pub work_location: WorkLocation,
    pub reporting_manager: Option<String>,
    pub skills: Vec<String>,
    pub performance_reviews: Vec<PerformanceReview>,
    pub benefits: Benefits,
    pub emergency_contact: EmergencyContact,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: String,
    pub phone_number: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    pub job_title: String,
    pub department: String,
    pub hire_date: String,
    pub employment_type: String,
    pub salary: f64,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkLocation {
    pub nearest_office: String,
    pub is_remote: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReview {
    pub review_date: String,
    pub rating: f64,
    pub comments: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Benefits {
    pub health_insurance: String,
    pub retirement_plan: String,
    pub paid_time_off: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone_number: String,
}

impl EmployeeRecord {
    /// Flat text that gets embedded and stored next to the record.
    pub fn summary(&self) -> String {
        let basic_info =
            format!("{} {}, born on {}", self.first_name, self.last_name, self.date_of_birth);
        let job_details =
            format!("{} in {}", self.job_details.job_title, self.job_details.department);
        let skills = self.skills.join(", ");
        let performance_reviews = self
            .performance_reviews
            .iter()
            .map(|review| {
                format!("Rated {} on {}: {}", review.rating, review.review_date, review.comments)
            })
            .collect::<Vec<_>>()
            .join(" ");
        let work_location = format!(
            "Works at {}, Remote: {}",
            self.work_location.nearest_office, self.work_location.is_remote
        );

        format!(
            "{basic_info}. Job: {job_details}. Skills: {skills}. Reviews: {performance_reviews}. Location: {work_location}. Notes: {}",
            self.notes
        )
    }
}
