//! Company knowledge base used as prompt context, plus the canned prompts
//! offered by the front ends.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const GREETING: &str = "Hello! I am the Kenmark ITan Solutions virtual assistant. \
How can I help you today with our services or training programs?";

pub const QUICK_QUESTIONS: [&str; 4] = [
    "What training programs do you have?",
    "Do you provide AI consulting?",
    "Where is your HQ located?",
    "How to enroll for PMP?",
];

pub const SERVICES_PROMPT: &str = "What services does Kenmark ITan Solutions offer?";
pub const SUPPORT_PROMPT: &str =
    "How can I contact support and what information do you have on support?";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub company_name: String,
    pub website: String,
    pub about: String,
    pub services: Vec<String>,
    pub training_programs: Vec<String>,
    pub contact: Contact,
    #[serde(default)]
    pub faqs: Vec<Faq>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

impl KnowledgeBase {
    /// Built-in facts about Kenmark ITan Solutions
    pub fn kenmark() -> Self {
        Self {
            company_name: "Kenmark ITan Solutions".to_string(),
            website: "https://kenmarkitan.com".to_string(),
            about: "Kenmark ITan Solutions bridges business needs with technological excellence \
                    through innovative IT services and global certification training."
                .to_string(),
            services: vec![
                "AI Solutions".to_string(),
                "Cloud Computing".to_string(),
                "Cybersecurity".to_string(),
                "IT Consulting".to_string(),
            ],
            training_programs: vec![
                "PMP Certification".to_string(),
                "Cloud Computing".to_string(),
                "AI Solutions".to_string(),
                "Cybersecurity".to_string(),
            ],
            contact: Contact {
                email: "info@kenmarkitan.com".to_string(),
                phone: "+91 80 1234 5678 / +1 (555) 987-6543".to_string(),
                address: "Bengaluru, India".to_string(),
            },
            faqs: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Verticals shown in the sidebar
    pub fn key_verticals(&self) -> &[String] {
        &self.training_programs
    }

    /// Render the knowledge base as the provider's system instruction
    pub fn system_instruction(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "You are the official virtual assistant of {}. ",
            self.company_name
        ));
        prompt.push_str("Answer questions about the company's services, training programs and support ");
        prompt.push_str("using only the facts below. If something is not covered, say so and point ");
        prompt.push_str("the user to the contact details. Keep answers concise and friendly.\n\n");

        prompt.push_str(&format!("Website: {}\n", self.website));
        prompt.push_str(&format!("About: {}\n", self.about));

        if !self.services.is_empty() {
            prompt.push_str(&format!("Services: {}\n", self.services.join(", ")));
        }
        if !self.training_programs.is_empty() {
            prompt.push_str(&format!(
                "Training programs: {}\n",
                self.training_programs.join(", ")
            ));
        }

        prompt.push_str(&format!(
            "Contact: email {}, phone {}, address {}\n",
            self.contact.email, self.contact.phone, self.contact.address
        ));

        if !self.faqs.is_empty() {
            prompt.push_str("\nFrequently asked questions:\n");
            for faq in &self.faqs {
                prompt.push_str(&format!("Q: {}\nA: {}\n", faq.question, faq.answer));
            }
        }

        prompt
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::kenmark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_system_instruction_mentions_company_and_contact() {
        let kb = KnowledgeBase::kenmark();
        let prompt = kb.system_instruction();
        assert!(prompt.contains("Kenmark ITan Solutions"));
        assert!(prompt.contains("info@kenmarkitan.com"));
        assert!(prompt.contains("PMP Certification"));
        assert!(!prompt.contains("Frequently asked questions"));
    }

    #[test]
    fn test_faqs_are_rendered() {
        let mut kb = KnowledgeBase::kenmark();
        kb.faqs.push(Faq {
            question: "Do you offer weekend batches?".to_string(),
            answer: "Yes, for PMP.".to_string(),
        });
        let prompt = kb.system_instruction();
        assert!(prompt.contains("Q: Do you offer weekend batches?\nA: Yes, for PMP."));
    }

    #[test]
    fn test_load_camel_case_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kb.json");
        fs::write(
            &path,
            r#"{
                "companyName": "Acme",
                "website": "https://acme.test",
                "about": "Widgets.",
                "services": ["Widgets"],
                "trainingPrograms": [],
                "contact": { "email": "a@acme.test", "phone": "1", "address": "Nowhere" }
            }"#,
        )
        .unwrap();

        let kb = KnowledgeBase::load(&path).unwrap();
        assert_eq!(kb.company_name, "Acme");
        assert!(kb.faqs.is_empty());
    }

    #[test]
    fn test_quick_questions_are_non_empty() {
        assert!(QUICK_QUESTIONS.iter().all(|q| !q.trim().is_empty()));
    }
}
