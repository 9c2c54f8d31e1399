use needfinder_core::{Need, Subreddit};

pub fn restate_need(need: &Need) -> Vec<String> {
    vec![format!(
        "Pretend you have the following need. State that need concisely in a single sentence \
         from your perspective. The first word should be \"I\".\n\nNeed: {need}\n"
    )]
}

pub fn generate_user_groups(need: &Need) -> Vec<String> {
    vec![
        "List 7 user groups who have the following problem and a short reason why they have it. \
         Then, list the top 3 groups who have the problem the most."
            .to_string(),
        format!("Problem: {need}"),
    ]
}

pub fn summarize(title: &str, content: &str, need: &Need) -> Vec<String> {
    vec![format!(
        "Here is a reddit post I am interested in:\n\n\
         title: {title}\n\n\
         contents: {content}\n\n\
         Who is this person? What are they asking for? How does this post relate to the \
         following need?\n\n\
         Need: {need}\n"
    )]
}

pub fn discern_applicability(title: &str, content: &str, need: &Need) -> Vec<String> {
    vec![format!(
        "Here is the title and content of a reddit post I am interested in:\n\n\
         title: {title}\n\
         content: {content}\n\n\
         Does the person writing this post explicitly mention that they have the following \
         need? {need}\n\n\
         Explain your reasoning before you answer. Answer true if the person has the need, or \
         false otherwise. Label your true/false answer with \"Answer:\".\n"
    )]
}

pub fn score_post_relevance(title: &str, summary: &str, need: &Need) -> Vec<String> {
    vec![format!(
        "Here is the title and summary of a reddit post I am interested in:\n\
         title: {title}\n\
         summary: {summary}\n\n\
         On a scale of 1 to 10, how likely is it that the person writing this post has the \
         following need? If you are not sure, make your best guess, or answer 1.\n\n\
         Need: {need}\n\n\
         Answer one integer between 1 and 10.\n"
    )]
}

pub fn score_subreddit_relevance(subreddit: &Subreddit, need: &Need) -> Vec<String> {
    vec![format!(
        "Here is a subreddit I am interested in: {name}\n\
         Here is the description of the subreddit: {description}\n\n\
         Please answer the following question. If you are not sure, answer 1:\n\
         On a scale of 1 to 10, how likely is it that anyone in this subreddit has the \
         following need?\n\n\
         Need: {need}\n\n\
         Answer one integer between 1 and 10.\n",
        name = subreddit.name,
        description = subreddit.description,
    )]
}
