use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chatgraph::*;

#[derive(Debug, PartialEq, Eq)]
pub enum PlanStep {
    /// The bot says this.
    Line(String),
    /// This choice is offered (its raw content).
    Option(String),
    /// The user types this.
    Say(String),
    Stop,
}

impl PlanStep {
    fn new(line: &str) -> Self {
        let mut split_line = line.splitn(2, ": ");
        match split_line.next() {
            Some("line") => Self::Line(split_line.next().unwrap().to_owned()),
            Some("option") => Self::Option(split_line.next().unwrap().to_owned()),
            Some("say") => Self::Say(split_line.next().unwrap_or_default().to_owned()),
            Some("stop") => Self::Stop,
            Some(step) => panic!(
                "Could not parse test plan step \"{}\" in line \"{}\"",
                step, line
            ),
            None => panic!("Could not parse test plan step in line \"{}\"", line),
        }
    }
}

pub struct TestPlan {
    steps: Vec<PlanStep>,
    next_step_index: usize,
    options: Vec<String>,
}

impl TestPlan {
    pub fn load(plan_path: &Path) -> io::Result<Self> {
        let plan_text = fs::read_to_string(plan_path)?;
        let steps: Vec<_> = plan_text
            .lines()
            .map(|line| line.trim_start())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(PlanStep::new)
            .collect();

        Ok(Self {
            steps,
            next_step_index: 0,
            options: Vec::new(),
        })
    }

    /// Moves to the next line, say or stop step, collecting the options on the way.
    pub fn next(&mut self) {
        let prev_step = match self.next_step_index {
            i if i > 0 && i <= self.steps.len() => Some(&self.steps[i - 1]),
            _ => None,
        };
        if let Some(PlanStep::Say(_)) = prev_step {
            // The options we collected were answered; start over.
            self.options.clear();
        }

        while self.next_step_index <= self.steps.len() {
            let current_step = self.steps.get(self.next_step_index);

            self.next_step_index += 1;

            match current_step {
                Some(PlanStep::Option(option)) => {
                    self.options.push(option.clone());
                    continue;
                }
                _ => return,
            }
        }
    }

    pub fn get_current_step(&self) -> Option<&PlanStep> {
        match self.next_step_index {
            0 => None,
            i if i <= self.steps.len() => Some(&self.steps[i - 1]),
            _ => Some(&PlanStep::Stop),
        }
    }
}

pub struct PlanRunner {
    graph: Graph,
    plan_path: PathBuf,
    embeddings: Option<Arc<EmbeddingProvider>>,
    pub transcript: Arc<Transcript>,
}

impl PlanRunner {
    pub fn new(graph_stem: &str, plan_path: &str) -> Self {
        let _ = pretty_env_logger::try_init();

        let graph = loader::load_graph(Path::new(graph_stem), "start").unwrap();
        Self::with_graph(graph, plan_path)
    }

    pub fn with_graph(graph: Graph, plan_path: &str) -> Self {
        Self {
            graph,
            plan_path: PathBuf::from(plan_path),
            embeddings: None,
            transcript: Arc::new(Transcript::new()),
        }
    }

    pub fn with_embeddings(mut self, path: &str) -> Self {
        self.embeddings = Some(Arc::new(EmbeddingProvider::new(path)));
        self
    }

    fn matcher(&self) -> MatcherHandle {
        let log = self.transcript.clone();
        match &self.embeddings {
            Some(embeddings) => {
                SoftCosineMatcher::new(MatchPolicy::default(), embeddings.clone(), log).into()
            }
            None => StringMatcher::new(MatchPolicy::default(), log).into(),
        }
    }

    /// Plays the plan against a fresh session and hands the finished session back.
    pub fn run(&self) -> Chat<'_> {
        let mut plan = TestPlan::load(&self.plan_path).unwrap();
        let mut chat = Chat::new(&self.graph, self.matcher(), self.transcript.clone());
        let mut request = START.to_string();

        loop {
            let nodes = chat.advance(&request);
            plan.next();
            let plan_step = plan.get_current_step().unwrap();

            let first = match nodes.first() {
                Some(first) => first,
                None => {
                    // Assert that the test plan expects the end of the conversation.
                    assert_eq!(*plan_step, PlanStep::Stop);
                    break;
                }
            };

            if first.is_output() {
                // Assert that the test plan expects this line.
                assert!(
                    matches!(plan_step, PlanStep::Line(text) if *text == first.content),
                    "[{}] Expected {:?}, got the line \"{}\"",
                    plan.next_step_index,
                    plan_step,
                    first.content
                );
                request = START.to_string();
                continue;
            }

            // Assert that the test plan expects these choices.
            let offered: Vec<&str> = nodes
                .iter()
                .filter(|node| node.kind == NodeKind::Choice)
                .map(|node| node.content.as_str())
                .collect();
            assert_eq!(offered, plan.options, "[{}] Unexpected choices", plan.next_step_index);

            match plan_step {
                PlanStep::Say(text) => request = text.clone(),
                step => panic!("Expected PlanStep::Say, got {:?}", step),
            }
        }

        chat
    }
}
