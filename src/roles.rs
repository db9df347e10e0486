//! Closed set of specialist analyst roles and fuzzy label resolution
//!
//! Roles are aligned to MITRE ATT&CK tactics. Planning output refers to
//! roles by free-text label; [`Role::resolve`] maps any label back onto the
//! closed set so downstream stages never see an unknown role.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A specialist analysis role, one per ATT&CK tactic the pipeline covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Phishing, exploited public-facing applications, external remote services
    InitialAccess,
    /// Command and script execution, service creation, WMI usage
    Execution,
    /// Scheduled tasks, autostart entries, registry run keys
    Persistence,
    /// Token manipulation, UAC bypass, process injection
    PrivilegeEscalation,
    /// Log clearing, masquerading, indicator removal
    DefenseEvasion,
    /// Brute force, credential dumping, lsass access
    CredentialAccess,
    /// Account, network and system enumeration
    Discovery,
    /// Remote services, SMB/WinRM/SSH movement between hosts
    LateralMovement,
    /// Local data staging, clipboard and screen capture
    Collection,
    /// Outbound transfers, C2 channels, non-standard protocols
    Exfiltration,
}

/// Canonical resolution order. Fixed so fuzzy matching is reproducible.
pub const ALL_ROLES: [Role; 10] = [
    Role::InitialAccess,
    Role::Execution,
    Role::Persistence,
    Role::PrivilegeEscalation,
    Role::DefenseEvasion,
    Role::CredentialAccess,
    Role::Discovery,
    Role::LateralMovement,
    Role::Collection,
    Role::Exfiltration,
];

/// Role used when a label cannot be resolved and for placeholder assignments
pub const DEFAULT_ROLE: Role = Role::Discovery;

impl Role {
    /// Canonical role name as it appears in planning prompts and output
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Role::InitialAccess => "Initial Access Specialist",
            Role::Execution => "Execution Specialist",
            Role::Persistence => "Persistence Specialist",
            Role::PrivilegeEscalation => "Privilege Escalation Specialist",
            Role::DefenseEvasion => "Defense Evasion Specialist",
            Role::CredentialAccess => "Credential Access Specialist",
            Role::Discovery => "Discovery Specialist",
            Role::LateralMovement => "Lateral Movement Specialist",
            Role::Collection => "Collection Specialist",
            Role::Exfiltration => "Exfiltration Specialist",
        }
    }

    /// Resolve a free-text label onto the closed role set
    ///
    /// Exact (case-sensitive) match wins immediately; otherwise the first
    /// canonical name that contains the label case-insensitively wins, in
    /// [`ALL_ROLES`] order. Unresolvable labels fall back to
    /// [`DEFAULT_ROLE`]. Never fails.
    pub fn resolve(label: &str) -> Role {
        let trimmed = label.trim();
        for role in ALL_ROLES {
            if role.canonical_name() == trimmed {
                return role;
            }
        }

        let lower = trimmed.to_lowercase();
        if !lower.is_empty() {
            for role in ALL_ROLES {
                if role.canonical_name().to_lowercase().contains(&lower) {
                    tracing::debug!(label = trimmed, resolved = role.canonical_name(), "mapped inexact role label");
                    return role;
                }
            }
        }

        tracing::warn!(label = trimmed, "unknown role label, using default role");
        DEFAULT_ROLE
    }

    /// System prompt briefing for a worker bound to this role
    pub fn briefing(&self) -> &'static str {
        match self {
            Role::InitialAccess => {
                "You are an endpoint log analyst specializing in identifying INITIAL ACCESS \
                 tactics. Look for evidence of phishing, exploitation of public-facing \
                 applications, external remote services being leveraged, hardware additions, \
                 or trusted relationship compromise. Pay special attention to:\n\
                 - New process creation from external sources\n\
                 - Email attachments being executed\n\
                 - Web browsers executing suspicious content\n\
                 - VPN or remote access connections from unusual sources"
            }
            Role::Execution => {
                "You are an endpoint log analyst specializing in analyzing EXECUTION tactics. \
                 Look for evidence of command and script execution, container administration \
                 commands, native API calls, system services, or Windows Management \
                 Instrumentation usage. Pay special attention to:\n\
                 - Command-line interface usage patterns\n\
                 - PowerShell or bash commands\n\
                 - Script execution (JavaScript, VBScript, Python, etc.)\n\
                 - Service creation or modification"
            }
            Role::Persistence => {
                "You are an endpoint log analyst specializing in identifying PERSISTENCE \
                 mechanisms. Look for evidence of account manipulation, boot/logon autostart \
                 execution, scheduled tasks/jobs, or registry modifications. Pay special \
                 attention to:\n\
                 - New scheduled tasks or cron jobs\n\
                 - Registry modifications in run keys\n\
                 - New services or daemons\n\
                 - Startup folder modifications\n\
                 - Kernel module or driver loading"
            }
            Role::PrivilegeEscalation => {
                "You are an endpoint log analyst specializing in detecting PRIVILEGE \
                 ESCALATION attempts. Look for evidence of access token manipulation, \
                 exploitation for privilege escalation, process injection, or \
                 sudo/admin-equivalent operations. Pay special attention to:\n\
                 - UAC bypasses\n\
                 - Sudo commands or runas usage\n\
                 - Service permissions being modified\n\
                 - Process handle manipulation\n\
                 - Unusual process ancestry"
            }
            Role::DefenseEvasion => {
                "You are an endpoint log analyst specializing in finding DEFENSE EVASION \
                 techniques. Look for evidence of clearing logs, deobfuscation of files, \
                 hidden files/directories, indicator removal, masquerading, or process \
                 injection. Pay special attention to:\n\
                 - Log clearing or deletion events\n\
                 - Hidden files or directories\n\
                 - Timestomping\n\
                 - File deletion\n\
                 - Rootkit installation"
            }
            Role::CredentialAccess => {
                "You are an endpoint log analyst specializing in identifying CREDENTIAL \
                 ACCESS attempts. Look for evidence of brute force attempts, credential \
                 dumping, input capture, OS credential dumping, or password policy \
                 discovery. Pay special attention to:\n\
                 - Multiple failed authentication attempts\n\
                 - Access to credential stores\n\
                 - Memory access to lsass.exe\n\
                 - Creation of minidump files\n\
                 - Keylogging processes"
            }
            Role::Discovery => {
                "You are an endpoint log analyst specializing in detecting DISCOVERY \
                 activities. Look for evidence of account discovery, file/directory \
                 discovery, network service scanning, permission group discovery, or system \
                 information discovery. Pay special attention to:\n\
                 - Network discovery commands (ping, nslookup, etc.)\n\
                 - Account enumeration\n\
                 - System information commands\n\
                 - Active Directory queries\n\
                 - Permission group enumeration"
            }
            Role::LateralMovement => {
                "You are an endpoint log analyst specializing in finding LATERAL MOVEMENT \
                 attempts. Look for evidence of internal remote services, lateral tool \
                 transfer, remote services, or exploitation of remote services. Pay special \
                 attention to:\n\
                 - Remote desktop connections\n\
                 - SMB connections\n\
                 - WMI or WinRM usage\n\
                 - SSH connections between systems\n\
                 - Remote execution via PsExec or similar tools"
            }
            Role::Collection => {
                "You are an endpoint log analyst specializing in identifying DATA \
                 COLLECTION activities. Look for evidence of audio capture, clipboard data \
                 collection, data from local systems, email collection, or screen capture. \
                 Pay special attention to:\n\
                 - Large amounts of data being accessed\n\
                 - Unusual access patterns to important files\n\
                 - Database read operations\n\
                 - Email access activities\n\
                 - Screen capture processes"
            }
            Role::Exfiltration => {
                "You are an endpoint log analyst specializing in detecting DATA \
                 EXFILTRATION. Look for evidence of automated exfiltration, exfiltration \
                 over alternative protocols, exfiltration over C2 channel, or scheduled \
                 transfers. Pay special attention to:\n\
                 - Unusual outbound network connections\n\
                 - Large outbound data transfers\n\
                 - Usage of non-standard protocols\n\
                 - Connections to known-bad IPs or domains\n\
                 - Scheduled tasks that connect to external systems"
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}
