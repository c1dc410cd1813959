use super::trigger::Trigger;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// High-value document categories shipped out of the box.
pub fn default_triggers() -> Vec<Trigger> {
    vec![
        Trigger::builder()
            .name("personal_injury_complaints")
            .priority(10)
            .nos_codes(strings(&["360", "361", "362", "363", "364", "365", "366", "367", "368"]))
            .doc_numbers(vec![1])
            .keywords(strings(&["personal injury", "negligence", "malpractice"]))
            .build(),
        Trigger::builder()
            .name("mass_tort_cases")
            .priority(9)
            .keywords(strings(&["mass tort", "mdl", "multidistrict", "multi-district"]))
            .doc_numbers(vec![1])
            .build(),
        Trigger::builder()
            .name("consumer_class_actions")
            .priority(8)
            .nos_codes(strings(&["480"]))
            .keywords(strings(&["class action", "consumer", "tcpa", "fdcpa", "fcra"]))
            .doc_numbers(vec![1])
            .build(),
        Trigger::builder()
            .name("product_liability")
            .priority(8)
            .nos_codes(strings(&["315", "365"]))
            .keywords(strings(&["product liability", "defect", "recall"]))
            .doc_numbers(vec![1])
            .build(),
        Trigger::builder()
            .name("employment_discrimination")
            .priority(7)
            .nos_codes(strings(&["442"]))
            .keywords(strings(&["discrimination", "wrongful termination", "eeoc", "title vii"]))
            .doc_numbers(vec![1])
            .build(),
        Trigger::builder()
            .name("securities_fraud")
            .priority(7)
            .nos_codes(strings(&["850"]))
            .keywords(strings(&["securities fraud", "sec", "investor", "stock"]))
            .doc_numbers(vec![1])
            .build(),
        Trigger::builder()
            .name("patent_cases")
            .priority(6)
            .nos_codes(strings(&["830"]))
            .case_types(strings(&["cv"]))
            .keywords(strings(&["patent", "infringement"]))
            .doc_numbers(vec![1])
            .build(),
        Trigger::builder()
            .name("antitrust")
            .priority(6)
            .nos_codes(strings(&["410"]))
            .keywords(strings(&["antitrust", "monopoly", "price fixing", "sherman act"]))
            .doc_numbers(vec![1])
            .build(),
        Trigger::builder()
            .name("summary_judgment_motions")
            .priority(5)
            .case_types(strings(&["cv"]))
            .motion_types(strings(&["summary judgment"]))
            .keywords(strings(&["motion for summary judgment", "msj"]))
            .build(),
        Trigger::builder()
            .name("preliminary_injunctions")
            .priority(5)
            .motion_types(strings(&[
                "preliminary injunction",
                "temporary restraining order",
                "tro",
            ]))
            .keywords(strings(&["preliminary injunction", "temporary restraining", "tro"]))
            .build(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_defaults_are_well_formed() {
        let triggers = default_triggers();
        assert_eq!(triggers.len(), 10);

        let names: HashSet<_> = triggers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), triggers.len());
        assert!(triggers.iter().all(|t| (1..=10).contains(&t.priority)));
        assert!(triggers.iter().all(|t| t.enabled));
        assert_eq!(triggers[0].name, "personal_injury_complaints");
    }
}
