use super::GenerationContext;
use crate::planner::DocumentSpec;

/// Longest excerpt of a dependency included in the prompt
const DEPENDENCY_EXCERPT_CHARS: usize = 4000;

/// Build the generation prompt for one document
pub fn build_prompt(spec: &DocumentSpec, context: &GenerationContext) -> String {
    let frameworks = if spec.frameworks.is_empty() {
        "none specified".to_string()
    } else {
        spec.frameworks
            .iter()
            .map(|f| f.as_str().to_uppercase())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut prompt = format!(
        "You are a compliance document specialist. Write the complete text of the \
        following document.\n\n\
        ## Document\n\n\
        - **Title:** {}\n\
        - **Type:** {}\n\
        - **Audience:** {}\n\
        - **Frameworks:** {}\n",
        spec.title, spec.document_type, spec.target_audience, frameworks
    );

    if !spec.format_hints.is_empty() {
        prompt.push_str(&format!(
            "- **Target formats:** {}\n",
            spec.format_hints.join(", ")
        ));
    }

    if !spec.description.trim().is_empty() {
        prompt.push_str(&format!("\n## Requirements\n\n{}\n", spec.description.trim()));
    }

    let project = &context.project;
    if project.industry.is_some() || !project.jurisdictions.is_empty() {
        prompt.push_str("\n## Organization\n\n");
        if let Some(industry) = &project.industry {
            prompt.push_str(&format!("- **Industry:** {}\n", industry));
        }
        if !project.jurisdictions.is_empty() {
            prompt.push_str(&format!(
                "- **Jurisdictions:** {}\n",
                project.jurisdictions.join(", ")
            ));
        }
        if let Some(size) = &project.organization_size {
            prompt.push_str(&format!("- **Organization size:** {}\n", size));
        }
    }

    if !context.dependencies.is_empty() {
        prompt.push_str(
            "\n## Related Documents\n\n\
            This document builds on the documents below. Refer to each of them by \
            title where relevant, and keep entity names, retention periods and \
            contact details consistent with them.\n",
        );
        for dep in &context.dependencies {
            let excerpt: String = dep.content.text.chars().take(DEPENDENCY_EXCERPT_CHARS).collect();
            prompt.push_str(&format!(
                "\n### {} ({})\n\n```\n{}\n```\n",
                dep.title, dep.id, excerpt
            ));
        }
    }

    prompt.push_str(
        "\n## Output\n\n\
        Use a markdown heading for every section. Include an effective date and \
        contact information. Output only the document text.\n",
    );

    if context.attempt > 1 {
        prompt.push_str(&format!(
            "\n(Attempt {}: the previous attempt failed, return the full document.)\n",
            context.attempt
        ));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ContentBlob, DependencyContent};

    fn spec() -> DocumentSpec {
        DocumentSpec {
            id: "dpia".to_string(),
            title: "Data Protection Impact Assessment".to_string(),
            description: "Assess the analytics pipeline".to_string(),
            document_type: "dpia".to_string(),
            format_hints: vec!["docx".to_string()],
            dependencies: Vec::new(),
            frameworks: Vec::new(),
            required: true,
            target_audience: "legal".to_string(),
            position: 0,
        }
    }

    #[test]
    fn test_prompt_includes_spec_details() {
        let prompt = build_prompt(&spec(), &GenerationContext::default());
        assert!(prompt.contains("Data Protection Impact Assessment"));
        assert!(prompt.contains("Assess the analytics pipeline"));
        assert!(prompt.contains("docx"));
        assert!(!prompt.contains("Related Documents"));
    }

    #[test]
    fn test_prompt_includes_dependency_content() {
        let context = GenerationContext {
            dependencies: vec![DependencyContent {
                id: "policy".to_string(),
                title: "Privacy Policy".to_string(),
                content: ContentBlob::from_text("Acme Ltd retains data for 7 years."),
            }],
            attempt: 2,
            ..Default::default()
        };
        let prompt = build_prompt(&spec(), &context);
        assert!(prompt.contains("### Privacy Policy (policy)"));
        assert!(prompt.contains("retains data for 7 years"));
        assert!(prompt.contains("Attempt 2"));
    }
}
