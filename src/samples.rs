use clap::ValueEnum;

const BUSINESS_ANALYST: &str = "Job Title: Business Analyst

Responsibilities:
- Analyze business requirements and processes to identify improvements
- Collaborate with stakeholders to understand needs and document requirements
- Develop and maintain project documentation and reports
- Facilitate meetings and workshops to gather information
- Support system testing and implementation

Required Skills:
- Strong analytical and problem-solving abilities
- Excellent written and verbal communication skills
- Experience with requirements gathering and documentation
- Knowledge of business process modeling
- Proficiency in Microsoft Office suite, especially Excel";

const FRONTEND_DEVELOPER: &str = "Job Title: Frontend Developer

Responsibilities:
- Develop responsive user interfaces using React.js
- Collaborate with backend developers to integrate APIs
- Implement UI/UX designs with a focus on usability
- Write clean, maintainable, and efficient code
- Participate in code reviews and testing

Required Skills:
- Strong proficiency in JavaScript, HTML5, and CSS3
- Experience with React.js and related libraries
- Knowledge of modern frontend build pipelines
- Familiarity with RESTful APIs and state management
- Understanding of cross-browser compatibility";

const DATA_SCIENTIST: &str = "Job Title: Data Scientist

Responsibilities:
- Analyze complex data sets to derive meaningful insights
- Build and deploy machine learning models
- Develop data visualizations and dashboards
- Collaborate with stakeholders to understand business needs
- Present findings and recommendations

Required Skills:
- Proficiency in Python and data science libraries (Pandas, NumPy)
- Experience with machine learning frameworks
- Strong statistical analysis skills
- Knowledge of data visualization tools
- Excellent problem-solving abilities";

/// Bundled job descriptions for trying the service without writing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SampleJob {
    BusinessAnalyst,
    FrontendDeveloper,
    DataScientist,
}

impl SampleJob {
    pub fn label(self) -> &'static str {
        match self {
            SampleJob::BusinessAnalyst => "Business Management",
            SampleJob::FrontendDeveloper => "Software Engineer",
            SampleJob::DataScientist => "Data Scientist",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            SampleJob::BusinessAnalyst => BUSINESS_ANALYST,
            SampleJob::FrontendDeveloper => FRONTEND_DEVELOPER,
            SampleJob::DataScientist => DATA_SCIENTIST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::extract_job_title;

    #[test]
    fn samples_carry_extractable_titles() {
        assert_eq!(extract_job_title(SampleJob::BusinessAnalyst.text()), "Business Analyst");
        assert_eq!(extract_job_title(SampleJob::FrontendDeveloper.text()), "Frontend Developer");
        assert_eq!(extract_job_title(SampleJob::DataScientist.text()), "Data Scientist");
    }
}
