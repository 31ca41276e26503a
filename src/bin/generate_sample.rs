//! Writes `sample_attack.json`: a synthetic ATT&CK workbook with
//! `techniques`, `software`, `relationships` and `campaigns` sheets, sized so
//! every chart of the dashboard has something to show at default settings.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

const OUTPUT: &str = "sample_attack.json";

const TACTICS: [&str; 14] = [
    "reconnaissance",
    "resource-development",
    "initial-access",
    "execution",
    "persistence",
    "privilege-escalation",
    "defense-evasion",
    "credential-access",
    "discovery",
    "lateral-movement",
    "collection",
    "command-and-control",
    "exfiltration",
    "impact",
];

const PLATFORMS: [&str; 7] = ["Windows", "Linux", "macOS", "Network", "Containers", "IaaS", "SaaS"];

const DOMAINS: [(&str, f64); 3] = [
    ("enterprise-attack", 0.8),
    ("mobile-attack", 0.12),
    ("ics-attack", 0.08),
];

const VERBS: [&str; 12] = [
    "Abuse", "Hijack", "Inject", "Harvest", "Modify", "Masquerade", "Exploit", "Obfuscate",
    "Steal", "Tamper", "Proxy", "Enumerate",
];

const OBJECTS: [&str; 16] = [
    "Scheduled Task", "Registry Keys", "Cloud Storage", "Web Session Cookie", "Boot Loader",
    "Service Binary", "Browser Extensions", "Access Tokens", "Email Forwarding Rule",
    "Command Interpreter", "Domain Trust", "Kernel Modules", "Remote Services",
    "Container Image", "Network Share", "Input Capture",
];

const GROUP_NAMES: [&str; 16] = [
    "Crimson Heron", "Silent Lynx", "Ashen Viper", "Copper Falcon", "Glass Mantis",
    "Hollow Raven", "Iron Marten", "Jade Tortoise", "Lunar Jackal", "Night Kestrel",
    "Obsidian Moth", "Pale Orca", "Quartz Badger", "Rust Wolf", "Sable Ibis", "Tidal Hare",
];

const SOFTWARE_NAMES: [&str; 10] = [
    "Shadow", "Nimble", "Grim", "Tiny", "Quiet", "Rapid", "Blind", "Deep", "Hex", "Vapor",
];
const SOFTWARE_SUFFIXES: [&str; 5] = ["Loader", "RAT", "Stealer", "Beacon", "Wiper"];

const COMPONENTS: [&str; 24] = [
    "Process Creation", "Command Execution", "File Modification", "File Creation",
    "Network Traffic Content", "Network Connection Creation", "Windows Registry Key Modification",
    "Module Load", "OS API Execution", "Logon Session Creation", "User Account Authentication",
    "Scheduled Job Creation", "Service Creation", "Driver Load", "Script Execution",
    "Process Access", "Firewall Rule Modification", "Cloud Storage Access", "Image Creation",
    "Web Credential Usage", "Kernel Module Load", "Named Pipe Metadata", "WMI Creation",
    "Application Log Content",
];

const MITIGATIONS: [&str; 18] = [
    "User Training", "Privileged Account Management", "Execution Prevention",
    "Network Segmentation", "Multi-factor Authentication", "Audit", "Restrict File and Directory Permissions",
    "Disable or Remove Feature or Program", "Software Configuration", "Operating System Configuration",
    "Filter Network Traffic", "Update Software", "Password Policies", "Encrypt Sensitive Information",
    "Antivirus/Antimalware", "Behavior Prevention on Endpoint", "Application Isolation and Sandboxing",
    "Limit Access to Resource Over Network",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n.max(1)
    }

    /// Index in `0..n` biased towards the front, so a few entries dominate.
    fn skewed(&mut self, n: usize) -> usize {
        (self.next_f64().powi(3) * n as f64) as usize % n.max(1)
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }

    /// Between `min` and `max` distinct items, joined with ", ".
    fn tags(&mut self, items: &[&str], min: usize, max: usize) -> String {
        let count = min + self.below(max - min + 1);
        let mut chosen: Vec<&str> = Vec::new();
        while chosen.len() < count.min(items.len()) {
            let item = self.pick(items);
            if !chosen.contains(&item) {
                chosen.push(item);
            }
        }
        chosen.join(", ")
    }
}

fn record(pairs: &[(&str, Value)]) -> Value {
    let map: Map<String, Value> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Value::Object(map)
}

struct Entry {
    id: String,
    name: String,
}

fn relationship(source: &Entry, source_type: &str, mapping: &str, target: &Entry, target_type: &str) -> Value {
    json!({
        "source ID": source.id,
        "source name": source.name,
        "source type": source_type,
        "mapping type": mapping,
        "target ID": target.id,
        "target name": target.name,
        "target type": target_type,
    })
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // ---- Techniques ----
    let mut techniques = Vec::new();
    let mut technique_rows = Vec::new();
    for i in 0..80 {
        let name = format!("{} {}", VERBS[i % VERBS.len()], OBJECTS[(i * 7 + i / VERBS.len()) % OBJECTS.len()]);
        let entry = Entry {
            id: format!("T{}", 1001 + i),
            name,
        };
        let roll = rng.next_f64();
        let mut acc = 0.0;
        let domain = DOMAINS
            .iter()
            .find(|(_, weight)| {
                acc += weight;
                roll < acc
            })
            .map_or(DOMAINS[0].0, |(d, _)| *d);
        technique_rows.push(record(&[
            ("ID", json!(entry.id)),
            ("name", json!(entry.name)),
            ("domain", json!(domain)),
            ("platforms", json!(rng.tags(&PLATFORMS, 1, 3))),
            ("tactics", json!(rng.tags(&TACTICS, 1, 2))),
        ]));
        techniques.push(entry);
    }

    // ---- Software ----
    let mut software = Vec::new();
    let mut software_rows = Vec::new();
    for i in 0..40 {
        let entry = Entry {
            id: format!("S{:04}", i + 1),
            name: format!(
                "{}{}",
                SOFTWARE_NAMES[i % SOFTWARE_NAMES.len()],
                SOFTWARE_SUFFIXES[(i / SOFTWARE_NAMES.len() + i) % SOFTWARE_SUFFIXES.len()]
            ),
        };
        software_rows.push(record(&[
            ("ID", json!(entry.id)),
            ("name", json!(entry.name)),
            ("domain", json!("enterprise-attack")),
            ("platforms", json!(rng.tags(&PLATFORMS[..4], 1, 3))),
        ]));
        software.push(entry);
    }

    let groups: Vec<Entry> = GROUP_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| Entry {
            id: format!("G{:04}", i + 1),
            name: name.to_string(),
        })
        .collect();

    // ---- Campaigns ----
    let mut campaigns = Vec::new();
    let mut campaign_rows = Vec::new();
    for i in 0..14 {
        let entry = Entry {
            id: format!("C{:04}", i + 1),
            name: format!("C{:04}", i + 1),
        };
        let year = 2012 + rng.below(12);
        let month = 1 + rng.below(12);
        let day = 1 + rng.below(28);
        let span_days = 20 + rng.below(900);
        let last = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
            .and_then(|d| d.checked_add_days(chrono::Days::new(span_days as u64)))
            .context("sample dates are valid")?;
        campaign_rows.push(record(&[
            ("ID", json!(entry.id)),
            ("name", json!(entry.name)),
            ("first seen", json!(format!("{year:04}-{month:02}-{day:02}"))),
            ("last seen", json!(last.format("%Y-%m-%d").to_string())),
        ]));
        campaigns.push(entry);
    }

    // ---- Relationships ----
    let mut relationships = Vec::new();
    for _ in 0..3000 {
        let group = &groups[rng.below(groups.len())];
        let technique = &techniques[rng.skewed(techniques.len())];
        relationships.push(relationship(group, "group", "uses", technique, "technique"));
    }
    for campaign in &campaigns {
        for _ in 0..(8 + rng.below(15)) {
            let technique = &techniques[rng.skewed(techniques.len())];
            relationships.push(relationship(campaign, "campaign", "uses", technique, "technique"));
        }
        let group = &groups[rng.skewed(groups.len())];
        relationships.push(relationship(campaign, "campaign", "attributed-to", group, "group"));
    }
    for _ in 0..600 {
        let group = &groups[rng.below(groups.len())];
        let tool = &software[rng.skewed(software.len())];
        relationships.push(relationship(group, "group", "uses", tool, "software"));
    }
    for (i, name) in COMPONENTS.iter().enumerate() {
        let component = Entry {
            id: format!("DC{:04}", i + 1),
            name: name.to_string(),
        };
        for _ in 0..(5 + rng.skewed(60)) {
            let technique = &techniques[rng.below(techniques.len())];
            relationships.push(relationship(&component, "data-component", "detects", technique, "technique"));
        }
    }
    for (i, name) in MITIGATIONS.iter().enumerate() {
        let mitigation = Entry {
            id: format!("M{}", 1001 + i),
            name: name.to_string(),
        };
        for _ in 0..(5 + rng.skewed(50)) {
            let technique = &techniques[rng.below(techniques.len())];
            relationships.push(relationship(&mitigation, "mitigation", "mitigates", technique, "technique"));
        }
    }

    let workbook = json!({
        "techniques": technique_rows,
        "software": software_rows,
        "relationships": relationships,
        "campaigns": campaign_rows,
    });

    let file = File::create(OUTPUT).with_context(|| format!("creating {OUTPUT}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &workbook).context("writing sample workbook")?;
    println!(
        "Wrote {OUTPUT}: {} techniques, {} software, {} campaigns, {} relationships",
        techniques.len(),
        software.len(),
        campaigns.len(),
        relationships.len()
    );
    Ok(())
}
